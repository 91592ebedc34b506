use core::fmt;
use core::num::NonZeroU64;

/// Identifier of a flow token.
///
/// - serials start at 1 and are never reused within a process
/// - `NonZero` keeps `Option<TokenId>` the same size as `TokenId`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(NonZeroU64);

impl TokenId {
    /// Create an id from a 0-based serial by storing serial+1.
    pub fn from_serial(serial: u64) -> Self {
        Self(NonZeroU64::MIN.saturating_add(serial))
    }

    /// Recover the 0-based serial.
    pub fn serial(self) -> u64 {
        self.0.get() - 1
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.serial())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.serial())
    }
}

/// Monotonic allocator for token ids.
#[derive(Clone, Debug, Default)]
pub struct TokenIdAllocator {
    next: u64,
}

impl TokenIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> TokenId {
        let id = TokenId::from_serial(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trip_serial() {
        for s in [0_u64, 1, 2, 42, 10_000] {
            assert_eq!(TokenId::from_serial(s).serial(), s);
        }
    }

    #[test]
    fn option_id_is_small() {
        assert_eq!(
            core::mem::size_of::<TokenId>(),
            core::mem::size_of::<Option<TokenId>>()
        );
    }

    #[test]
    fn allocator_is_monotonic() {
        let mut alloc = TokenIdAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert!(a < b);
        assert_eq!(alloc.issued(), 2);
    }
}
