//! Headless runs and status recording.

use pp_core::RegisterBank;

use crate::error::{SimError, SimResult};
use crate::simulator::ProcessSimulator;
use crate::status::PlantStatus;

/// Options for headless runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Number of ticks to run
    pub ticks: u64,
    /// Record every N-th tick (decimation)
    pub record_every: u64,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            ticks: 600,
            record_every: 60,
        }
    }
}

/// Status time series of a headless run.
#[derive(Clone, Debug, Default)]
pub struct SimRecord {
    /// Tick numbers (completed ticks at the time of the snapshot)
    pub tick: Vec<u64>,
    pub status: Vec<PlantStatus>,
}

impl SimRecord {
    pub fn len(&self) -> usize {
        self.tick.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tick.is_empty()
    }

    pub fn last(&self) -> Option<(u64, &PlantStatus)> {
        self.tick.last().copied().zip(self.status.last())
    }
}

/// Run the simulator against `bank` without a wall clock.
pub fn run_sim(
    sim: &mut ProcessSimulator,
    bank: &RegisterBank,
    opts: &SimOptions,
) -> SimResult<SimRecord> {
    if opts.record_every == 0 {
        return Err(SimError::InvalidArg {
            what: "record_every must be positive",
        });
    }

    let mut record = SimRecord::default();
    record.tick.push(sim.ticks());
    record.status.push(sim.status());

    for step in 1..=opts.ticks {
        sim.tick(bank)?;
        if step % opts.record_every == 0 {
            record.tick.push(sim.ticks());
            record.status.push(sim.status());
        }
    }

    // Always record final state
    if opts.ticks % opts.record_every != 0 {
        record.tick.push(sim.ticks());
        record.status.push(sim.status());
    }

    Ok(record)
}
