//! Fixed-rate tick loop on a dedicated thread.
//!
//! The loop sleeps until the next scheduled tick. When a tick overruns its
//! slot the schedule is re-anchored to "now" instead of bursting through the
//! missed ticks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pp_core::{RegisterBank, TickTimer};
use tracing::{debug, error, info, warn};

use crate::error::{SimError, SimResult};
use crate::simulator::ProcessSimulator;
use crate::status::PlantStatus;

/// Tick loop configuration.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub tick_hz: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { tick_hz: 60.0 }
    }
}

impl RunConfig {
    pub fn with_tick_hz(mut self, tick_hz: f64) -> Self {
        self.tick_hz = tick_hz;
        self
    }

    pub fn period(&self) -> SimResult<Duration> {
        if !(self.tick_hz.is_finite() && self.tick_hz > 0.0 && self.tick_hz <= 10_000.0) {
            return Err(SimError::InvalidArg {
                what: "tick rate must be within (0, 10000] Hz",
            });
        }
        Ok(Duration::from_secs_f64(1.0 / self.tick_hz))
    }
}

/// Handle to a running tick thread.
pub struct RunnerHandle {
    running: Arc<AtomicBool>,
    timer: Arc<TickTimer>,
    status: Arc<Mutex<PlantStatus>>,
    thread: Option<JoinHandle<ProcessSimulator>>,
}

impl RunnerHandle {
    /// Flag that keeps the loop alive; clearing it stops the loop after the
    /// current tick.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn timer(&self) -> &TickTimer {
        &self.timer
    }

    /// Status after the most recent tick.
    pub fn latest_status(&self) -> PlantStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stop the loop and hand the simulator back.
    pub fn stop(mut self) -> SimResult<ProcessSimulator> {
        self.running.store(false, Ordering::SeqCst);
        let thread = self.thread.take().ok_or_else(|| SimError::Runner {
            message: "tick thread already joined".to_string(),
        })?;
        thread.join().map_err(|_| SimError::Runner {
            message: "tick thread panicked".to_string(),
        })
    }
}

impl Drop for RunnerHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Start ticking `sim` against `bank` at `config.tick_hz`.
pub fn spawn_runner(
    mut sim: ProcessSimulator,
    bank: Arc<RegisterBank>,
    config: &RunConfig,
) -> SimResult<RunnerHandle> {
    let period = config.period()?;
    let running = Arc::new(AtomicBool::new(true));
    let timer = Arc::new(TickTimer::new());
    let status = Arc::new(Mutex::new(sim.status()));

    let thread = {
        let running = Arc::clone(&running);
        let timer = Arc::clone(&timer);
        let status = Arc::clone(&status);
        thread::Builder::new()
            .name("pp-tick".to_string())
            .spawn(move || {
                run_loop(&mut sim, &bank, period, &running, &timer, &status);
                sim
            })
            .map_err(|e| SimError::Runner {
                message: e.to_string(),
            })?
    };

    info!(tick_hz = config.tick_hz, "tick loop started");
    Ok(RunnerHandle {
        running,
        timer,
        status,
        thread: Some(thread),
    })
}

fn run_loop(
    sim: &mut ProcessSimulator,
    bank: &RegisterBank,
    period: Duration,
    running: &AtomicBool,
    timer: &TickTimer,
    status: &Mutex<PlantStatus>,
) {
    let mut next = Instant::now() + period;

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        if let Err(e) = sim.tick(bank) {
            error!(error = %e, tick = sim.ticks(), "tick failed, stopping loop");
            running.store(false, Ordering::SeqCst);
            break;
        }
        *status.lock().unwrap_or_else(PoisonError::into_inner) = sim.status();

        let now = Instant::now();
        if timer.record(now - started, period) || now > next {
            warn!(
                tick = sim.ticks(),
                elapsed_ms = (now - started).as_secs_f64() * 1e3,
                budget_ms = period.as_secs_f64() * 1e3,
                "tick overran its slot"
            );
            next = now + period;
            continue;
        }

        thread::sleep(next - now);
        next += period;
    }

    debug!(
        ticks = timer.count(),
        overruns = timer.overruns(),
        avg_ms = timer.average_seconds() * 1e3,
        "tick loop stopped"
    );
}
