//! Boiler thermal model.
//!
//! Temperature is a single lumped value for the whole boiler. It changes in
//! three ways, each on its own tick interval:
//! - mixing in newly arrived feed water (volume-weighted average)
//! - burner heating while the fuel valve is open
//! - Newton cooling toward ambient while it is closed

use pp_controls::Countdown;
use pp_core::Real;
use serde::{Deserialize, Serialize};

use crate::profile::{HeatingModel, PlantProfile};
use crate::token::Provenance;

pub const BOILING_POINT_C: Real = 100.0;

/// Volume-weighted mix of two bodies of water.
///
/// The result stays within the span of the two input temperatures.
pub fn mix(n1: usize, t1: Real, n2: usize, t2: Real) -> Real {
    let total = n1 + n2;
    if total == 0 {
        return t1;
    }
    let mixed = (n1 as Real * t1 + n2 as Real * t2) / total as Real;
    mixed.clamp(t1.min(t2), t1.max(t2))
}

/// Temperature rise for one heating interval.
pub fn heating_increment(model: &HeatingModel, fuel_step: u16, volume: usize) -> Real {
    match model {
        HeatingModel::FixedStep { increment_c } => increment_c.at(fuel_step),
        HeatingModel::Calorimetric {
            heat_j,
            mass_per_token_kg,
            specific_heat_j_per_kg_k,
        } => {
            let mass = volume as Real * mass_per_token_kg;
            if mass <= 0.0 {
                return 0.0;
            }
            heat_j.at(fuel_step) / (mass * specific_heat_j_per_kg_k)
        }
    }
}

/// One cooling interval of `T(t) = Ts + (T0 - Ts)·e^(-k)`.
///
/// Water at or below ambient is left alone.
pub fn newton_cooling(temp: Real, ambient: Real, k: Real) -> Real {
    if temp <= ambient {
        return temp;
    }
    ambient + (temp - ambient) * (-k).exp()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoilerState {
    Empty,
    Heating,
    Boiling,
}

impl BoilerState {
    pub fn to_register(self) -> u16 {
        match self {
            BoilerState::Empty => 0,
            BoilerState::Heating => 1,
            BoilerState::Boiling => 2,
        }
    }

    pub fn from_register(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(BoilerState::Empty),
            1 => Some(BoilerState::Heating),
            2 => Some(BoilerState::Boiling),
            _ => None,
        }
    }
}

/// Lumped boiler temperature plus the counters that drive it.
#[derive(Debug, Clone)]
pub struct BoilerThermal {
    temperature: Real,
    boiling: bool,
    pending_valve: usize,
    pending_condenser: usize,
    mix_clock: Countdown,
    heat_clock: Countdown,
    cool_clock: Countdown,
}

impl BoilerThermal {
    pub fn new(profile: &PlantProfile) -> Self {
        Self {
            temperature: 0.0,
            boiling: false,
            pending_valve: 0,
            pending_condenser: 0,
            mix_clock: Countdown::new(profile.mix_interval_ticks),
            heat_clock: Countdown::new(profile.fuel_temp_interval_ticks),
            cool_clock: Countdown::new(profile.cooling_interval_ticks),
        }
    }

    pub fn temperature(&self) -> Real {
        self.temperature
    }

    pub fn is_boiling(&self) -> bool {
        self.boiling
    }

    pub fn state(&self, volume: usize) -> BoilerState {
        if volume == 0 {
            BoilerState::Empty
        } else if self.boiling {
            BoilerState::Boiling
        } else {
            BoilerState::Heating
        }
    }

    /// Water that just entered the boiler, waiting for the next mix.
    pub fn note_arrival(&mut self, provenance: Provenance) {
        match provenance {
            Provenance::FromValve => self.pending_valve += 1,
            Provenance::FromCondenserReturn => self.pending_condenser += 1,
            Provenance::None => {}
        }
    }

    pub fn pending(&self) -> (usize, usize) {
        (self.pending_valve, self.pending_condenser)
    }

    /// Advance one tick.
    pub fn update(&mut self, profile: &PlantProfile, volume: usize, fuel_on: bool, fuel_step: u16) {
        if self.mix_clock.tick(profile.mix_interval_ticks) {
            self.mix_pending(profile, volume);
        }

        if fuel_on {
            self.cool_clock.reset(profile.cooling_interval_ticks);
            if volume > 0 && self.heat_clock.tick(profile.fuel_temp_interval_ticks) {
                let rise = heating_increment(&profile.heating, fuel_step, volume);
                self.temperature = (self.temperature + rise).min(BOILING_POINT_C);
            }
        } else {
            self.heat_clock.reset(profile.fuel_temp_interval_ticks);
            if self.cool_clock.tick(profile.cooling_interval_ticks) {
                self.temperature = newton_cooling(
                    self.temperature,
                    profile.ambient_temp_c,
                    profile.cooling_constant,
                );
            }
        }

        if volume == 0 {
            self.temperature = 0.0;
        }
        self.temperature = self.temperature.clamp(0.0, BOILING_POINT_C);
        self.boiling = self.temperature >= BOILING_POINT_C;
    }

    /// Force the empty-boiler reading once the last water token is gone.
    pub fn settle(&mut self, volume: usize) {
        if volume == 0 {
            self.temperature = 0.0;
            self.boiling = false;
        }
    }

    fn mix_pending(&mut self, profile: &PlantProfile, volume: usize) {
        let valve = std::mem::take(&mut self.pending_valve);
        let condenser = std::mem::take(&mut self.pending_condenser);
        if volume == 0 {
            self.temperature = 0.0;
            return;
        }

        // Water already in the boiler before the arrivals.
        let mut resident = volume.saturating_sub(valve + condenser);
        for (arrived, temp) in [
            (valve, profile.valve_water_temp_c),
            (condenser, profile.condenser_water_temp_c),
        ] {
            if arrived == 0 {
                continue;
            }
            self.temperature = mix(resident, self.temperature, arrived, temp);
            resident += arrived;
        }
    }
}
