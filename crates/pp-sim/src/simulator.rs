//! The process simulator: one tick of the power plant.
//!
//! A tick reads every command register under one lock, advances the model
//! without holding the lock, then publishes every sensor register under one
//! more lock. Registers a console may write (rate knobs, setpoints, pressure,
//! relief alarm) are written back only if they still hold the value read at
//! the start of the tick, so a console write that lands mid-tick is picked up
//! by the next tick instead of being overwritten.

use pp_controls::{
    Correction, Countdown, RateSetting, ReliefLatch, ReliefState, Switch, VolumeSetpoints,
};
use pp_core::{
    CoreResult, Real, RegisterBank, RegisterView, encode_count, encode_flag, encode_real, map,
};
use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::layout::{
    self, BURNER_X, BURNER_Y, CONDENSER, CONDENSER_FLOOR_Y, ENERGY_SPAWN_Y, PUMP_OUTLET, PYLON,
    Point, STEAM_SPAWN_Y, Zone,
};
use crate::profile::PlantProfile;
use crate::record::{SimOptions, SimRecord, run_sim};
use crate::shaft::TurbineShaft;
use crate::status::PlantStatus;
use crate::thermal::{BoilerState, BoilerThermal};
use crate::token::{Provenance, TokenKind, TokenPool, ZoneCounts};

/// Raw command words read at the start of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Commands {
    water_valve: u16,
    water_rate: u16,
    fuel_valve: u16,
    fuel_rate: u16,
    volume_low: u16,
    volume_high: u16,
    condenser_valve: u16,
    pressure_alarm: u16,
    pressure: u16,
    generator: u16,
    pylon: u16,
}

impl Commands {
    fn read(view: &RegisterView<'_>) -> CoreResult<Self> {
        Ok(Self {
            water_valve: view.get(map::WATER_PUMP_VALVE)?,
            water_rate: view.get(map::WATER_PUMP_RATE)?,
            fuel_valve: view.get(map::FUEL_VALVE)?,
            fuel_rate: view.get(map::FUEL_RATE)?,
            volume_low: view.get(map::BOILER_VOLUME_LOW)?,
            volume_high: view.get(map::BOILER_VOLUME_HIGH)?,
            condenser_valve: view.get(map::CONDENSER_VALVE)?,
            pressure_alarm: view.get(map::TURBINE_PRESSURE_HIGH)?,
            pressure: view.get(map::TURBINE_PRESSURE)?,
            generator: view.get(map::GENERATOR_STATUS)?,
            pylon: view.get(map::PYLON_STATUS)?,
        })
    }
}

/// Sensor values computed by a tick, published in one batch.
#[derive(Debug, Clone, Copy)]
struct Outputs {
    water_rate: Correction,
    fuel_rate: Correction,
    low_raw: u16,
    high_raw: u16,
    pressure: u16,
    alarm: u16,
    boiler_state: u16,
    boiler_temp: u16,
    boiler_volume: u16,
    condenser_volume: u16,
    generator_output: u16,
    rpm_level: u16,
    pylon_power: u16,
    need_water: u16,
    stop_water: u16,
}

/// Write `new` only if the register still holds `seen`.
fn publish_if_unchanged(
    view: &mut RegisterView<'_>,
    address: map::Address,
    seen: u16,
    new: u16,
) -> CoreResult<()> {
    if seen != new && view.get(address)? == seen {
        view.set(address, new)?;
    }
    Ok(())
}

pub struct ProcessSimulator {
    profile: PlantProfile,
    ticks: u64,

    water_rate: RateSetting,
    fuel_rate: RateSetting,
    setpoints: VolumeSetpoints,
    relief: ReliefLatch,
    pressure: Real,
    shaft: TurbineShaft,
    thermal: BoilerThermal,
    tokens: TokenPool,

    water_clock: Countdown,
    fire_clock: Countdown,
    steam_clock: Countdown,
    boil_clock: Countdown,
    condense_clock: Countdown,
    energy_clock: Countdown,
    condensed: u32,

    commands: Commands,
    counts: ZoneCounts,
    generator_output: u16,
    pylon_power: u16,
}

impl ProcessSimulator {
    pub fn new(profile: PlantProfile) -> SimResult<Self> {
        profile.validate()?;

        let init = &profile.initial;
        let water_rate = RateSetting::new(profile.water_steps(), init.water_step)?;
        let fuel_rate = RateSetting::new(profile.fuel_steps(), init.fuel_step)?;
        let setpoints = VolumeSetpoints::new(init.volume_low, init.volume_high)?;
        let relief = ReliefLatch::new(profile.pressure_low, profile.pressure_high)?;
        let shaft = TurbineShaft::new(profile.shaft.clone())?;
        let thermal = BoilerThermal::new(&profile);

        Ok(Self {
            water_clock: Countdown::new(profile.water_interval_ticks.at(init.water_step)),
            fire_clock: Countdown::new(profile.fire_interval_ticks.at(init.fuel_step)),
            steam_clock: Countdown::new(profile.steam_interval_ticks.at(init.fuel_step)),
            boil_clock: Countdown::new(boil_interval(&profile, init.fuel_step)),
            condense_clock: Countdown::new(profile.condense_interval_ticks),
            energy_clock: Countdown::new(profile.energy_interval_ticks),
            profile,
            ticks: 0,
            water_rate,
            fuel_rate,
            setpoints,
            relief,
            pressure: 0.0,
            shaft,
            thermal,
            tokens: TokenPool::new(),
            condensed: 0,
            commands: Commands::default(),
            counts: ZoneCounts::default(),
            generator_output: 0,
            pylon_power: 0,
        })
    }

    /// Write startup presets into `bank`.
    ///
    /// Every mapped register is reset: rate knobs and setpoints to their
    /// encoded presets, everything else to 0.
    pub fn install(&mut self, bank: &RegisterBank) -> SimResult<()> {
        let needed = usize::from(map::BOILER_STOP_WATER) + 1;
        if bank.size() < needed {
            return Err(SimError::InvalidArg {
                what: "register bank too small for the plant map",
            });
        }

        bank.with_lock(|view| -> CoreResult<()> {
            for d in map::REGISTERS {
                view.set(d.address, 0)?;
            }
            view.set(map::WATER_PUMP_RATE, self.water_rate.encoded())?;
            view.set(map::FUEL_RATE, self.fuel_rate.encoded())?;
            view.set(
                map::BOILER_VOLUME_LOW,
                VolumeSetpoints::encode(self.setpoints.low()),
            )?;
            view.set(
                map::BOILER_VOLUME_HIGH,
                VolumeSetpoints::encode(self.setpoints.high()),
            )?;
            view.set(map::TURBINE_PRESSURE, encode_real(self.pressure))?;
            Ok(())
        })?;

        info!(
            profile = %self.profile.name,
            water_step = self.water_rate.step(),
            fuel_step = self.fuel_rate.step(),
            "plant registers installed"
        );
        Ok(())
    }

    pub fn profile(&self) -> &PlantProfile {
        &self.profile
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn temperature(&self) -> Real {
        self.thermal.temperature()
    }

    pub fn pressure(&self) -> Real {
        self.pressure
    }

    pub fn rpm(&self) -> Real {
        self.shaft.rpm()
    }

    pub fn relief_state(&self) -> ReliefState {
        self.relief.state()
    }

    pub fn tokens(&self) -> &TokenPool {
        &self.tokens
    }

    /// Live token counts per zone as of the end of the last tick.
    pub fn zone_counts(&self) -> ZoneCounts {
        self.counts
    }

    pub fn boiler_volume(&self) -> usize {
        self.counts.get(Zone::Boiler, TokenKind::Water)
    }

    pub fn condenser_volume(&self) -> usize {
        self.counts.get(Zone::Condenser, TokenKind::Water)
    }

    pub fn boiler_state(&self) -> BoilerState {
        self.thermal.state(self.boiler_volume())
    }

    /// Status snapshot for viewers, as of the end of the last tick.
    pub fn status(&self) -> PlantStatus {
        let volume = self.boiler_volume();
        PlantStatus {
            water_pump_valve: Switch::from_register(self.commands.water_valve),
            water_pump_step: self.water_rate.step(),
            fuel_valve: Switch::from_register(self.commands.fuel_valve),
            fuel_step: self.fuel_rate.step(),
            boiler_state: self.boiler_state(),
            boiler_temp_c: self.thermal.temperature(),
            boiler_volume: encode_count(volume),
            volume_low: self.setpoints.low(),
            volume_high: self.setpoints.high(),
            condenser_valve: Switch::from_register(self.commands.condenser_valve),
            condenser_volume: encode_count(self.condenser_volume()),
            relief: self.relief.state(),
            turbine_pressure: encode_real(self.pressure),
            generator: Switch::from_register(self.commands.generator),
            generator_output: self.generator_output,
            pylon: Switch::from_register(self.commands.pylon),
            rpm_level: self.shaft.bucket(),
            pylon_power: self.pylon_power,
            need_water: self.setpoints.needs_water(volume),
            stop_water: self.setpoints.should_stop_water(volume),
        }
    }

    pub fn run_ticks(&mut self, bank: &RegisterBank, n: u64) -> SimResult<()> {
        for _ in 0..n {
            self.tick(bank)?;
        }
        Ok(())
    }

    /// Run `ticks` ticks, recording the status every `every` ticks.
    pub fn record(&mut self, bank: &RegisterBank, ticks: u64, every: u64) -> SimResult<SimRecord> {
        let opts = SimOptions {
            ticks,
            record_every: every,
        };
        run_sim(self, bank, &opts)
    }

    /// Advance the plant by one tick.
    ///
    /// Fails only when the bank cannot hold the register map; register
    /// contents never cause an error.
    pub fn tick(&mut self, bank: &RegisterBank) -> SimResult<()> {
        let cmds = bank.with_lock(|view| Commands::read(view))?;
        self.commands = cmds;

        // 1. rate correction
        let water_rate = self.water_rate.correct(cmds.water_rate);
        let fuel_rate = self.fuel_rate.correct(cmds.fuel_rate);
        if let Some(raw) = water_rate.publish {
            debug!(raw = cmds.water_rate, corrected = raw, "water pump rate corrected");
        }
        if let Some(raw) = fuel_rate.publish {
            debug!(raw = cmds.fuel_rate, corrected = raw, "fuel rate corrected");
        }
        let fuel_step = fuel_rate.step;

        // A pressure word that differs from what was last published was
        // written by someone else; it becomes the new integrator state.
        if cmds.pressure != encode_real(self.pressure) {
            debug!(
                from = self.pressure,
                to = cmds.pressure,
                "turbine pressure overridden externally"
            );
            self.pressure = Real::from(cmds.pressure);
        }

        // 2. spawn and drift
        self.spawn(&cmds, water_rate.step, fuel_step);
        let drift = self
            .tokens
            .drift(Switch::from_register(cmds.condenser_valve).is_on());

        // 3. zone accounting
        for provenance in self.tokens.claim_boiler_arrivals() {
            self.thermal.note_arrival(provenance);
        }
        let volume = self.tokens.count(Zone::Boiler, TokenKind::Water);

        // 4. thermal model
        let state_before = self.thermal.state(self.boiler_volume());
        let fuel_on = Switch::from_register(cmds.fuel_valve).is_on();
        self.thermal.update(&self.profile, volume, fuel_on, fuel_step);

        // 5. phase change
        self.phase_change(fuel_step);

        self.counts = self.tokens.zone_counts();
        let volume = self.boiler_volume();
        self.thermal.settle(volume);
        let state_after = self.thermal.state(volume);
        if state_before != state_after {
            info!(from = ?state_before, to = ?state_after, volume, "boiler state changed");
        }

        // 6. pressure and relief
        self.update_pressure(&cmds, drift.turbine_arrivals, fuel_step);

        // 7. shaft and electrical output
        self.shaft.step(drift.turbine_arrivals);
        let level = self.shaft.bucket();
        self.generator_output = if Switch::from_register(cmds.generator).is_on() {
            level
        } else {
            0
        };
        self.pylon_power = if Switch::from_register(cmds.pylon).is_on() {
            self.generator_output
        } else {
            0
        };

        // 8. setpoints
        let sp = self.setpoints.apply(cmds.volume_low, cmds.volume_high);

        let out = Outputs {
            water_rate,
            fuel_rate,
            low_raw: sp.low_raw,
            high_raw: sp.high_raw,
            pressure: encode_real(self.pressure),
            alarm: self.relief.state().alarm(),
            boiler_state: state_after.to_register(),
            boiler_temp: encode_real(self.thermal.temperature()),
            boiler_volume: encode_count(volume),
            condenser_volume: encode_count(self.condenser_volume()),
            generator_output: self.generator_output,
            rpm_level: level,
            pylon_power: self.pylon_power,
            need_water: encode_flag(self.setpoints.needs_water(volume)),
            stop_water: encode_flag(self.setpoints.should_stop_water(volume)),
        };
        bank.with_lock(|view| publish(view, &cmds, &out))?;

        self.ticks += 1;
        Ok(())
    }

    fn spawn(&mut self, cmds: &Commands, water_step: u16, fuel_step: u16) {
        let p = &self.profile;

        let stop_water = self.setpoints.should_stop_water(self.boiler_volume());
        if Switch::from_register(cmds.water_valve).is_on() && !stop_water {
            let period = p.water_interval_ticks.at(water_step);
            if self.water_clock.tick(period) {
                let x = layout::spread(self.tokens.next_serial(), PUMP_OUTLET.x, 1.0);
                self.tokens.spawn(
                    TokenKind::Water,
                    Point::new(x, PUMP_OUTLET.y),
                    Provenance::FromValve,
                );
            }
        }

        if Switch::from_register(cmds.fuel_valve).is_on()
            && self.fire_clock.tick(p.fire_interval_ticks.at(fuel_step))
        {
            for x in BURNER_X {
                self.tokens
                    .spawn(TokenKind::Fire, Point::new(x, BURNER_Y), Provenance::None);
            }
        }

        if self.pylon_power > 0 && self.energy_clock.tick(p.energy_interval_ticks) {
            let center = (PYLON.x0 + PYLON.x1) / 2.0;
            let x = layout::spread(self.tokens.next_serial(), center, 40.0);
            self.tokens
                .spawn(TokenKind::Energy, Point::new(x, ENERGY_SPAWN_Y), Provenance::None);
        }
    }

    fn phase_change(&mut self, fuel_step: u16) {
        let p = &self.profile;

        if self.thermal.is_boiling() {
            if self.steam_clock.tick(p.steam_interval_ticks.at(fuel_step)) {
                let x = layout::spread(self.tokens.next_serial(), 95.0, 70.0);
                self.tokens
                    .spawn(TokenKind::Steam, Point::new(x, STEAM_SPAWN_Y), Provenance::None);
            }
            if self.boil_clock.tick(boil_interval(p, fuel_step)) {
                self.tokens.retire_first(|t| {
                    t.kind == TokenKind::Water && t.zone() == Some(Zone::Boiler)
                });
            }
        }

        if self.condense_clock.tick(p.condense_interval_ticks)
            && self.tokens.retire_first(|t| t.is_condensable())
        {
            self.pressure = (self.pressure - p.condense_pressure_drop).max(0.0);
            self.condensed += 1;
            if self.condensed >= p.water_to_steam_ratio {
                self.condensed = 0;
                let center = (CONDENSER.x0 + CONDENSER.x1) / 2.0;
                let x = layout::spread(self.tokens.next_serial(), center, 24.0);
                self.tokens.spawn(
                    TokenKind::Water,
                    Point::new(x, CONDENSER_FLOOR_Y),
                    Provenance::FromCondenserReturn,
                );
            }
        }
    }

    fn update_pressure(&mut self, cmds: &Commands, arrivals: usize, fuel_step: u16) {
        let p = &self.profile;
        self.pressure += p.steam_pressure_gain.at(fuel_step) * arrivals as Real;

        let before = self.relief.state();
        if before == ReliefState::Normal && cmds.pressure_alarm != 0 {
            warn!(pressure = self.pressure, "pressure relief tripped by operator");
            self.relief.trip();
        }

        if self.relief.update(self.pressure).is_releasing() {
            let vented = self.tokens.vent_turbine_steam();
            let drop = p.relief_bleed_per_tick + p.vent_pressure_drop * vented as Real;
            self.pressure = (self.pressure - drop).max(0.0);
            self.relief.update(self.pressure);
        }

        let after = self.relief.state();
        if before != after {
            match after {
                ReliefState::Releasing => {
                    warn!(pressure = self.pressure, "turbine pressure high, relief open")
                }
                ReliefState::Normal => {
                    info!(pressure = self.pressure, "turbine pressure normal, relief closed")
                }
            }
        }
    }
}

fn boil_interval(profile: &PlantProfile, fuel_step: u16) -> u32 {
    profile
        .steam_interval_ticks
        .at(fuel_step)
        .saturating_mul(profile.water_to_steam_ratio)
}

fn publish(view: &mut RegisterView<'_>, cmds: &Commands, out: &Outputs) -> CoreResult<()> {
    if let Some(raw) = out.water_rate.publish {
        publish_if_unchanged(view, map::WATER_PUMP_RATE, cmds.water_rate, raw)?;
    }
    if let Some(raw) = out.fuel_rate.publish {
        publish_if_unchanged(view, map::FUEL_RATE, cmds.fuel_rate, raw)?;
    }
    publish_if_unchanged(view, map::BOILER_VOLUME_LOW, cmds.volume_low, out.low_raw)?;
    publish_if_unchanged(view, map::BOILER_VOLUME_HIGH, cmds.volume_high, out.high_raw)?;
    publish_if_unchanged(view, map::TURBINE_PRESSURE, cmds.pressure, out.pressure)?;
    publish_if_unchanged(view, map::TURBINE_PRESSURE_HIGH, cmds.pressure_alarm, out.alarm)?;

    view.set(map::BOILER_STATE, out.boiler_state)?;
    view.set(map::BOILER_TEMP, out.boiler_temp)?;
    view.set(map::BOILER_WATER_VOLUME, out.boiler_volume)?;
    view.set(map::CONDENSER_WATER_VOLUME, out.condenser_volume)?;
    view.set(map::GENERATOR_OUTPUT, out.generator_output)?;
    view.set(map::TURBINE_RPM, out.rpm_level)?;
    view.set(map::PYLON_POWER, out.pylon_power)?;
    view.set(map::BOILER_NEED_WATER, out.need_water)?;
    view.set(map::BOILER_STOP_WATER, out.stop_water)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant() -> (ProcessSimulator, RegisterBank) {
        let bank = RegisterBank::new();
        let mut sim = ProcessSimulator::new(PlantProfile::standard()).unwrap();
        sim.install(&bank).unwrap();
        (sim, bank)
    }

    #[test]
    fn install_writes_presets() {
        let (_sim, bank) = plant();
        assert_eq!(bank.get(map::WATER_PUMP_RATE).unwrap(), 3);
        assert_eq!(bank.get(map::FUEL_RATE).unwrap(), 3);
        assert_eq!(bank.get(map::BOILER_VOLUME_LOW).unwrap(), 3);
        assert_eq!(bank.get(map::BOILER_VOLUME_HIGH).unwrap(), 103);
        assert_eq!(bank.get(map::TURBINE_PRESSURE).unwrap(), 0);
    }

    #[test]
    fn install_rejects_tiny_bank() {
        let bank = RegisterBank::with_size(8).unwrap();
        let mut sim = ProcessSimulator::new(PlantProfile::standard()).unwrap();
        assert!(matches!(
            sim.install(&bank),
            Err(SimError::InvalidArg { .. })
        ));
    }

    #[test]
    fn idle_tick_changes_nothing() {
        let (mut sim, bank) = plant();
        let before = bank.snapshot();
        sim.run_ticks(&bank, 10).unwrap();
        assert_eq!(bank.snapshot(), before);
        assert_eq!(sim.ticks(), 10);
    }

    #[test]
    fn delta_code_on_rate_register_is_corrected() {
        let (mut sim, bank) = plant();
        bank.set(map::WATER_PUMP_RATE, 2).unwrap();
        sim.tick(&bank).unwrap();
        assert_eq!(bank.get(map::WATER_PUMP_RATE).unwrap(), 4);
        assert_eq!(sim.status().water_pump_step, 1);
    }

    #[test]
    fn mid_tick_console_write_survives_publish() {
        let mut cmds = Commands::default();
        let bank = RegisterBank::new();
        bank.set(map::FUEL_RATE, 2).unwrap();
        cmds.fuel_rate = 9;
        let out = Outputs {
            water_rate: Correction {
                step: 0,
                publish: None,
            },
            fuel_rate: Correction {
                step: 3,
                publish: Some(6),
            },
            low_raw: 0,
            high_raw: 0,
            pressure: 0,
            alarm: 0,
            boiler_state: 0,
            boiler_temp: 0,
            boiler_volume: 0,
            condenser_volume: 0,
            generator_output: 0,
            rpm_level: 0,
            pylon_power: 0,
            need_water: 0,
            stop_water: 0,
        };
        bank.with_lock(|v| publish(v, &cmds, &out)).unwrap();
        // register no longer held the value the tick read, so it is left alone
        assert_eq!(bank.get(map::FUEL_RATE).unwrap(), 2);
    }

    #[test]
    fn manual_trip_opens_relief() {
        let (mut sim, bank) = plant();
        bank.set(map::TURBINE_PRESSURE, 350).unwrap();
        sim.tick(&bank).unwrap();
        assert_eq!(sim.relief_state(), ReliefState::Normal);

        bank.set(map::TURBINE_PRESSURE_HIGH, 1).unwrap();
        sim.tick(&bank).unwrap();
        assert_eq!(sim.relief_state(), ReliefState::Releasing);
        assert_eq!(bank.get(map::TURBINE_PRESSURE_HIGH).unwrap(), 1);
        assert_eq!(bank.get(map::TURBINE_PRESSURE).unwrap(), 335);
    }

    #[test]
    fn generator_and_pylon_gate_output() {
        let (mut sim, bank) = plant();
        sim.shaft.step(100);
        bank.set(map::PYLON_STATUS, 1).unwrap();
        sim.tick(&bank).unwrap();
        assert_eq!(bank.get(map::GENERATOR_OUTPUT).unwrap(), 0);
        assert_eq!(bank.get(map::PYLON_POWER).unwrap(), 0);

        bank.set(map::GENERATOR_STATUS, 1).unwrap();
        sim.tick(&bank).unwrap();
        assert_eq!(bank.get(map::GENERATOR_OUTPUT).unwrap(), 3);
        assert_eq!(bank.get(map::TURBINE_RPM).unwrap(), 3);
        assert_eq!(bank.get(map::PYLON_POWER).unwrap(), 3);

        bank.set(map::PYLON_STATUS, 0).unwrap();
        sim.tick(&bank).unwrap();
        assert_eq!(bank.get(map::GENERATOR_OUTPUT).unwrap(), 3);
        assert_eq!(bank.get(map::PYLON_POWER).unwrap(), 0);
    }

    #[test]
    fn pylon_power_emits_energy_tokens() {
        let (mut sim, bank) = plant();
        sim.shaft.step(100);
        bank.set(map::GENERATOR_STATUS, 1).unwrap();
        bank.set(map::PYLON_STATUS, 1).unwrap();
        sim.run_ticks(&bank, 30).unwrap();
        assert!(sim.zone_counts().get(Zone::Pylon, TokenKind::Energy) > 0);
    }
}
