//! Plant lifecycle: register bank, tick loop and protocol server together.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pp_core::RegisterBank;
use pp_modbus::{ProtocolServer, ServerConfig, ServerHandle};
use pp_sim::{PlantProfile, PlantStatus, ProcessSimulator, RunConfig, RunnerHandle, spawn_runner};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// Everything needed to bring a plant up.
#[derive(Debug, Clone)]
pub struct PlantOptions {
    pub server: ServerConfig,
    pub run: RunConfig,
    pub profile: PlantProfile,
}

impl Default for PlantOptions {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            run: RunConfig::default(),
            profile: PlantProfile::standard(),
        }
    }
}

/// Counters reported once the plant is down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShutdownReport {
    pub ticks: u64,
    pub overruns: u64,
    /// Wall time spent inside ticks.
    pub busy_seconds: f64,
    pub max_tick_seconds: f64,
}

/// A running plant.
pub struct PlantService {
    bank: Arc<RegisterBank>,
    runner: RunnerHandle,
    server: ServerHandle,
}

impl PlantService {
    /// Seed the registers, bind the server, then start ticking.
    pub async fn start(opts: PlantOptions) -> AppResult<Self> {
        opts.profile.validate()?;
        opts.run.period()?;

        let profile_name = opts.profile.name.clone();
        let bank = Arc::new(RegisterBank::new());
        let mut sim = ProcessSimulator::new(opts.profile)?;
        sim.install(&bank)?;

        let server = ProtocolServer::bind(&opts.server, Arc::clone(&bank))
            .await?
            .spawn();
        let runner = match spawn_runner(sim, Arc::clone(&bank), &opts.run) {
            Ok(runner) => runner,
            Err(e) => {
                server.shutdown().await?;
                return Err(e.into());
            }
        };

        info!(
            addr = %server.local_addr(),
            profile = %profile_name,
            tick_hz = opts.run.tick_hz,
            "plant online"
        );
        Ok(Self {
            bank,
            runner,
            server,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn bank(&self) -> &Arc<RegisterBank> {
        &self.bank
    }

    pub fn latest_status(&self) -> PlantStatus {
        self.runner.latest_status()
    }

    pub fn is_running(&self) -> bool {
        self.runner.is_running()
    }

    /// Close the server and its connections, then stop the tick thread.
    pub async fn shutdown(self) -> AppResult<ShutdownReport> {
        let Self { runner, server, .. } = self;
        server.shutdown().await?;

        let timer = runner.timer();
        let (overruns, busy_seconds, max_tick_seconds) =
            (timer.overruns(), timer.total_seconds(), timer.max_seconds());
        let sim = tokio::task::spawn_blocking(move || runner.stop())
            .await
            .map_err(|e| AppError::Simulation(format!("tick thread join failed: {}", e)))??;

        let report = ShutdownReport {
            ticks: sim.ticks(),
            overruns,
            busy_seconds,
            max_tick_seconds,
        };
        info!(
            ticks = report.ticks,
            overruns = report.overruns,
            max_tick_ms = report.max_tick_seconds * 1e3,
            "plant offline"
        );
        Ok(report)
    }
}

/// Serve until Ctrl-C, or until the tick loop stops on its own.
pub async fn run_until_ctrl_c(opts: PlantOptions) -> AppResult<ShutdownReport> {
    let plant = PlantService::start(opts).await?;
    let mut watchdog = tokio::time::interval(Duration::from_millis(500));
    let mut polls = 0u64;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                signal?;
                info!("interrupt received, shutting down");
                break;
            }
            _ = watchdog.tick() => {
                if !plant.is_running() {
                    warn!("tick loop stopped, shutting down");
                    break;
                }
                polls += 1;
                if polls % 20 == 0 {
                    let s = plant.latest_status();
                    debug!(
                        temp_c = s.boiler_temp_c,
                        boiler = s.boiler_volume,
                        pressure = s.turbine_pressure,
                        relief = ?s.relief,
                        "plant status"
                    );
                }
            }
        }
    }

    plant.shutdown().await
}
