//! The shared register bank.
//!
//! A fixed-size table of 16-bit holding registers behind one coarse lock.
//! Every bulk operation (range read, range write, simulator batch) takes the
//! lock exactly once, so a reader never observes half of a batch.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{CoreError, CoreResult};
use crate::map::Address;

/// Number of holding registers in a default bank.
pub const BANK_SIZE: usize = 100;

/// Thread-safe table of holding registers.
#[derive(Debug)]
pub struct RegisterBank {
    regs: Mutex<Vec<u16>>,
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBank {
    /// Create a zeroed bank of [`BANK_SIZE`] registers.
    pub fn new() -> Self {
        Self {
            regs: Mutex::new(vec![0; BANK_SIZE]),
        }
    }

    /// Create a zeroed bank with a custom size (1..=65536 registers).
    pub fn with_size(size: usize) -> CoreResult<Self> {
        if size == 0 || size > usize::from(u16::MAX) + 1 {
            return Err(CoreError::InvalidArg {
                what: "bank size must be within 1..=65536",
            });
        }
        Ok(Self {
            regs: Mutex::new(vec![0; size]),
        })
    }

    // A panic while holding the lock cannot leave a register half-written,
    // so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Vec<u16>> {
        self.regs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    pub fn get(&self, address: Address) -> CoreResult<u16> {
        let regs = self.lock();
        regs.get(usize::from(address))
            .copied()
            .ok_or(CoreError::AddressOutOfRange {
                address,
                size: regs.len(),
            })
    }

    pub fn set(&self, address: Address, value: u16) -> CoreResult<()> {
        let mut regs = self.lock();
        RegisterView { regs: &mut regs }.set(address, value)
    }

    /// Read `count` contiguous registers under a single lock acquisition.
    pub fn read_range(&self, start: Address, count: usize) -> CoreResult<Vec<u16>> {
        let mut regs = self.lock();
        RegisterView { regs: &mut regs }
            .range(start, count)
            .map(<[u16]>::to_vec)
    }

    /// Write contiguous registers under a single lock acquisition.
    ///
    /// Nothing is written when the range does not fit.
    pub fn write_range(&self, start: Address, values: &[u16]) -> CoreResult<()> {
        let mut regs = self.lock();
        let mut view = RegisterView { regs: &mut regs };
        view.range(start, values.len())?;
        let begin = usize::from(start);
        view.regs[begin..begin + values.len()].copy_from_slice(values);
        Ok(())
    }

    /// Copy of the whole bank.
    pub fn snapshot(&self) -> Vec<u16> {
        self.lock().clone()
    }

    /// Run `f` against the locked bank.
    ///
    /// Used for multi-register batches that must appear atomic to readers.
    /// Keep `f` short and free of I/O: every client request waits on it.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut RegisterView<'_>) -> R) -> R {
        let mut regs = self.lock();
        let mut view = RegisterView { regs: &mut regs };
        f(&mut view)
    }
}

/// Mutable view of a locked bank.
pub struct RegisterView<'a> {
    regs: &'a mut Vec<u16>,
}

impl RegisterView<'_> {
    pub fn size(&self) -> usize {
        self.regs.len()
    }

    pub fn get(&self, address: Address) -> CoreResult<u16> {
        self.regs
            .get(usize::from(address))
            .copied()
            .ok_or(CoreError::AddressOutOfRange {
                address,
                size: self.regs.len(),
            })
    }

    pub fn set(&mut self, address: Address, value: u16) -> CoreResult<()> {
        let size = self.regs.len();
        let slot = self
            .regs
            .get_mut(usize::from(address))
            .ok_or(CoreError::AddressOutOfRange { address, size })?;
        *slot = value;
        Ok(())
    }

    fn range(&self, start: Address, count: usize) -> CoreResult<&[u16]> {
        let size = self.regs.len();
        let begin = usize::from(start);
        match begin.checked_add(count) {
            Some(end) if end <= size => Ok(&self.regs[begin..end]),
            _ => Err(CoreError::RangeOutOfBounds { start, count, size }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn get_set_round_trip() {
        let bank = RegisterBank::new();
        bank.set(7, 42).unwrap();
        assert_eq!(bank.get(7).unwrap(), 42);
        assert_eq!(bank.get(8).unwrap(), 0);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let bank = RegisterBank::new();
        assert!(matches!(
            bank.get(100),
            Err(CoreError::AddressOutOfRange { address: 100, .. })
        ));
        assert!(bank.set(u16::MAX, 1).is_err());
    }

    #[test]
    fn range_bounds() {
        let bank = RegisterBank::new();
        assert_eq!(bank.read_range(1, 24).unwrap().len(), 24);
        assert_eq!(bank.read_range(0, 100).unwrap().len(), 100);
        assert!(bank.read_range(90, 11).is_err());
        assert!(bank.read_range(u16::MAX, 2).is_err());
    }

    #[test]
    fn write_range_is_all_or_nothing() {
        let bank = RegisterBank::new();
        assert!(bank.write_range(98, &[1, 2, 3]).is_err());
        assert_eq!(bank.get(98).unwrap(), 0);

        bank.write_range(10, &[5, 6, 7]).unwrap();
        assert_eq!(bank.read_range(10, 3).unwrap(), vec![5, 6, 7]);
    }

    #[test]
    fn with_size_validates() {
        assert!(RegisterBank::with_size(0).is_err());
        assert_eq!(RegisterBank::with_size(16).unwrap().size(), 16);
    }

    #[test]
    fn consecutive_reads_are_identical() {
        let bank = RegisterBank::new();
        bank.write_range(1, &[3, 1, 4, 1, 5, 9]).unwrap();
        assert_eq!(bank.read_range(1, 24).unwrap(), bank.read_range(1, 24).unwrap());
    }

    #[test]
    fn batches_are_never_torn() {
        let bank = Arc::new(RegisterBank::new());

        let writer = {
            let bank = Arc::clone(&bank);
            thread::spawn(move || {
                for i in 0..5_000u16 {
                    bank.with_lock(|view| {
                        view.set(6, i).unwrap();
                        view.set(7, i).unwrap();
                    });
                }
            })
        };

        for _ in 0..5_000 {
            let pair = bank.read_range(6, 2).unwrap();
            assert_eq!(pair[0], pair[1]);
        }
        writer.join().unwrap();
    }
}
