//! Integration tests: operator scenarios against the standard plant.
//!
//! Each test drives the plant only through register writes, the way a
//! console would, and checks what the console would read back.

use pp_core::{RegisterBank, map};
use pp_sim::{BoilerState, PlantProfile, ProcessSimulator, TokenKind, Zone};

fn plant() -> (ProcessSimulator, RegisterBank) {
    let bank = RegisterBank::new();
    let mut sim = ProcessSimulator::new(PlantProfile::standard()).unwrap();
    sim.install(&bank).unwrap();
    (sim, bank)
}

fn reg(bank: &RegisterBank, addr: u16) -> u16 {
    bank.get(addr).unwrap()
}

/// Pump water at full rate for `ticks`, then close the valve and let every
/// token land and mix.
fn fill_boiler(sim: &mut ProcessSimulator, bank: &RegisterBank, ticks: u64) {
    bank.set(map::WATER_PUMP_VALVE, 1).unwrap();
    sim.run_ticks(bank, ticks).unwrap();
    bank.set(map::WATER_PUMP_VALVE, 0).unwrap();
    sim.run_ticks(bank, 150).unwrap();
}

#[test]
fn cold_start_stays_cold_and_empty() {
    let (mut sim, bank) = plant();
    sim.run_ticks(&bank, 600).unwrap();

    assert_eq!(reg(&bank, map::BOILER_TEMP), 0);
    assert_eq!(reg(&bank, map::BOILER_WATER_VOLUME), 0);
    assert_eq!(reg(&bank, map::CONDENSER_WATER_VOLUME), 0);
    assert_eq!(reg(&bank, map::BOILER_STATE), 0);
    assert_eq!(reg(&bank, map::TURBINE_PRESSURE), 0);
    assert!(sim.tokens().is_empty());
}

#[test]
fn pump_at_step_two_fills_monotonically() {
    let (mut sim, bank) = plant();
    bank.set(map::WATER_PUMP_RATE, 5).unwrap();
    bank.set(map::WATER_PUMP_VALVE, 1).unwrap();

    let mut prev = 0;
    for _ in 0..300 {
        sim.tick(&bank).unwrap();
        let volume = reg(&bank, map::BOILER_WATER_VOLUME);
        assert!(volume >= prev, "volume dropped from {prev} to {volume}");
        prev = volume;
    }
    assert!(prev > 50, "only {prev} tokens after 300 ticks");
    assert_eq!(sim.status().water_pump_step, 2);

    // closing the valve freezes the volume once in-flight water has landed
    bank.set(map::WATER_PUMP_VALVE, 0).unwrap();
    sim.run_ticks(&bank, 60).unwrap();
    let settled = reg(&bank, map::BOILER_WATER_VOLUME);
    sim.run_ticks(&bank, 300).unwrap();
    assert_eq!(reg(&bank, map::BOILER_WATER_VOLUME), settled);
}

#[test]
fn feed_water_sets_boiler_temperature() {
    let (mut sim, bank) = plant();
    fill_boiler(&mut sim, &bank, 60);

    let profile = PlantProfile::standard();
    assert_eq!(sim.temperature(), profile.valve_water_temp_c);
    assert_eq!(reg(&bank, map::BOILER_STATE), BoilerState::Heating.to_register());
}

#[test]
fn heating_rises_each_interval_then_pins_at_boiling() {
    let (mut sim, bank) = plant();
    fill_boiler(&mut sim, &bank, 100);
    let interval = PlantProfile::standard().fuel_temp_interval_ticks;
    assert!(reg(&bank, map::BOILER_WATER_VOLUME) > 0);

    bank.set(map::FUEL_VALVE, 1).unwrap();
    let mut prev = sim.temperature();
    while sim.temperature() < 100.0 {
        sim.run_ticks(&bank, u64::from(interval)).unwrap();
        let t = sim.temperature();
        assert!(t > prev, "temperature did not rise: {prev} -> {t}");
        assert!(t <= 100.0);
        prev = t;
    }

    for _ in 0..600 {
        sim.tick(&bank).unwrap();
        assert!(reg(&bank, map::BOILER_WATER_VOLUME) > 0);
        assert_eq!(sim.temperature(), 100.0);
        assert_eq!(reg(&bank, map::BOILER_TEMP), 100);
        assert_eq!(reg(&bank, map::BOILER_STATE), BoilerState::Boiling.to_register());
    }
    // boiling produced steam somewhere along the loop
    assert!(sim.tokens().iter().any(|t| t.kind == TokenKind::Steam));
}

#[test]
fn forced_over_pressure_relief_cycle() {
    let (mut sim, bank) = plant();
    bank.set(map::TURBINE_PRESSURE, 450).unwrap();

    sim.tick(&bank).unwrap();
    assert_eq!(reg(&bank, map::TURBINE_PRESSURE_HIGH), 1);

    let mut prev = reg(&bank, map::TURBINE_PRESSURE);
    assert!(prev < 450);
    let mut ticks = 0;
    while reg(&bank, map::TURBINE_PRESSURE_HIGH) == 1 {
        sim.tick(&bank).unwrap();
        let p = reg(&bank, map::TURBINE_PRESSURE);
        assert!(p < prev, "pressure did not fall: {prev} -> {p}");
        prev = p;
        ticks += 1;
        assert!(ticks < 100, "relief never closed");
    }
    assert!(prev < 300);

    // with no steam the alarm stays clear
    sim.run_ticks(&bank, 50).unwrap();
    assert_eq!(reg(&bank, map::TURBINE_PRESSURE_HIGH), 0);
    assert_eq!(reg(&bank, map::TURBINE_PRESSURE), prev);
}

#[test]
fn alarm_holds_through_the_hysteresis_band() {
    let (mut sim, bank) = plant();
    bank.set(map::TURBINE_PRESSURE, 401).unwrap();
    sim.tick(&bank).unwrap();
    assert_eq!(reg(&bank, map::TURBINE_PRESSURE_HIGH), 1);

    // operator pins pressure inside the band: alarm must not clear
    for _ in 0..5 {
        bank.set(map::TURBINE_PRESSURE, 350).unwrap();
        sim.tick(&bank).unwrap();
        assert_eq!(reg(&bank, map::TURBINE_PRESSURE_HIGH), 1);
    }
    bank.set(map::TURBINE_PRESSURE, 299).unwrap();
    sim.tick(&bank).unwrap();
    assert_eq!(reg(&bank, map::TURBINE_PRESSURE_HIGH), 0);
}

#[test]
fn stop_water_alarm_cuts_the_feed_pump() {
    let (mut sim, bank) = plant();
    // absolute write: high threshold of 10 tokens
    bank.set(map::BOILER_VOLUME_HIGH, 13).unwrap();
    bank.set(map::WATER_PUMP_VALVE, 1).unwrap();
    sim.run_ticks(&bank, 400).unwrap();

    assert_eq!(reg(&bank, map::BOILER_STOP_WATER), 1);
    let volume = reg(&bank, map::BOILER_WATER_VOLUME);
    // a couple of tokens may already have been in flight
    assert!((10..=16).contains(&volume), "volume {volume}");
    let in_flight = sim
        .tokens()
        .iter()
        .filter(|t| t.kind == TokenKind::Water && t.zone().is_none())
        .count();
    assert_eq!(in_flight, 0);
}

#[test]
fn need_water_alarm_tracks_low_threshold() {
    let (mut sim, bank) = plant();
    bank.set(map::BOILER_VOLUME_LOW, 8).unwrap();
    sim.tick(&bank).unwrap();
    assert_eq!(reg(&bank, map::BOILER_NEED_WATER), 1);

    fill_boiler(&mut sim, &bank, 40);
    assert!(reg(&bank, map::BOILER_WATER_VOLUME) >= 5);
    assert_eq!(reg(&bank, map::BOILER_NEED_WATER), 0);
}

#[test]
fn condensate_returns_through_the_condenser_valve() {
    let (mut sim, bank) = plant();
    fill_boiler(&mut sim, &bank, 100);
    bank.set(map::FUEL_VALVE, 1).unwrap();

    // boil until condensate collects behind the closed valve
    let mut collected = 0;
    for _ in 0..3_000 {
        sim.tick(&bank).unwrap();
        collected = reg(&bank, map::CONDENSER_WATER_VOLUME);
        if collected > 0 {
            break;
        }
    }
    assert!(collected > 0, "no condensate after 3000 ticks");

    // shut the burner and let the steam still in the loop condense
    bank.set(map::FUEL_VALVE, 0).unwrap();
    sim.run_ticks(&bank, 600).unwrap();
    let waiting = reg(&bank, map::CONDENSER_WATER_VOLUME);
    let boiler = reg(&bank, map::BOILER_WATER_VOLUME);
    assert!(waiting >= collected);

    bank.set(map::CONDENSER_VALVE, 1).unwrap();
    sim.run_ticks(&bank, 60).unwrap();
    assert_eq!(sim.zone_counts().get(Zone::Condenser, TokenKind::Water), 0);
    assert_eq!(reg(&bank, map::CONDENSER_WATER_VOLUME), 0);
    assert_eq!(reg(&bank, map::BOILER_WATER_VOLUME), boiler + waiting);
}

#[test]
fn running_plant_turns_the_generator() {
    let (mut sim, bank) = plant();
    fill_boiler(&mut sim, &bank, 100);
    bank.set(map::FUEL_VALVE, 1).unwrap();
    bank.set(map::GENERATOR_STATUS, 1).unwrap();
    bank.set(map::PYLON_STATUS, 1).unwrap();

    let mut best = 0;
    for _ in 0..1_500 {
        sim.tick(&bank).unwrap();
        best = best.max(reg(&bank, map::PYLON_POWER));
    }
    assert!(best > 0);
    assert!(sim.rpm() > 0.0);
    assert_eq!(
        reg(&bank, map::GENERATOR_OUTPUT),
        reg(&bank, map::TURBINE_RPM)
    );
}

#[test]
fn classic_profile_heats_by_calorimetry() {
    let bank = RegisterBank::new();
    let mut sim = ProcessSimulator::new(PlantProfile::classic()).unwrap();
    sim.install(&bank).unwrap();
    fill_boiler(&mut sim, &bank, 100);

    let start = sim.temperature();
    assert_eq!(start, PlantProfile::classic().valve_water_temp_c);

    bank.set(map::FUEL_VALVE, 1).unwrap();
    sim.run_ticks(&bank, 60).unwrap();
    let volume = sim.zone_counts().get(Zone::Boiler, TokenKind::Water) as f64;
    let expected = start + 60.0e6 / (volume * 20.0 * 4186.0);
    assert!((sim.temperature() - expected).abs() < 1e-6);
}
