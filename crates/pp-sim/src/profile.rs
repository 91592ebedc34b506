//! Plant profiles: every tunable constant of the process model.
//!
//! One engine runs every plant revision; a revision is just a named
//! [`PlantProfile`]. Profiles serialise to YAML so operators can ship their
//! own tuning next to the binary.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Lookup table indexed by a logical rate step.
///
/// Steps beyond the end of the table read the last entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable<T> {
    values: Vec<T>,
}

impl<T: Copy> RateTable<T> {
    pub fn new(values: Vec<T>) -> SimResult<Self> {
        if values.is_empty() {
            return Err(SimError::InvalidArg {
                what: "rate table must not be empty",
            });
        }
        Ok(Self { values })
    }

    pub fn at(&self, step: u16) -> T {
        let idx = usize::from(step).min(self.values.len().saturating_sub(1));
        self.values[idx]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}

/// How the burner raises boiler temperature on each heating interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum HeatingModel {
    /// Fixed temperature increment per fuel step, regardless of volume.
    FixedStep { increment_c: RateTable<f64> },
    /// `ΔT = Q / (m·c)` where `m` scales with the boiler volume.
    Calorimetric {
        heat_j: RateTable<f64>,
        mass_per_token_kg: f64,
        specific_heat_j_per_kg_k: f64,
    },
}

/// Turbine shaft tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaftParams {
    /// rpm added per steam token entering the turbine.
    pub spin_gain_rpm: f64,
    /// Fraction of rpm lost to friction each tick.
    pub friction_per_tick: f64,
    pub max_rpm: f64,
    /// Lower rpm bound of output levels 1, 2 and 3.
    pub bucket_thresholds_rpm: [f64; 3],
}

/// Register presets written at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialSettings {
    pub water_step: u16,
    pub fuel_step: u16,
    pub volume_low: u16,
    pub volume_high: u16,
}

impl Default for InitialSettings {
    fn default() -> Self {
        Self {
            water_step: 0,
            fuel_step: 0,
            volume_low: 0,
            volume_high: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,

    /// Ticks between pumped water tokens, per water step.
    pub water_interval_ticks: RateTable<u32>,
    /// Ticks between burner flames, per fuel step.
    pub fire_interval_ticks: RateTable<u32>,
    /// Ticks between steam tokens while boiling, per fuel step.
    pub steam_interval_ticks: RateTable<u32>,
    /// Pressure added per steam token entering the turbine, per fuel step.
    pub steam_pressure_gain: RateTable<f64>,
    pub heating: HeatingModel,

    /// Steam tokens per water token, both when boiling off and condensing.
    pub water_to_steam_ratio: u32,

    pub mix_interval_ticks: u32,
    pub fuel_temp_interval_ticks: u32,
    pub cooling_interval_ticks: u32,
    /// Newton cooling constant applied once per cooling interval.
    pub cooling_constant: f64,
    pub ambient_temp_c: f64,
    pub valve_water_temp_c: f64,
    pub condenser_water_temp_c: f64,

    pub condense_interval_ticks: u32,
    pub condense_pressure_drop: f64,
    pub vent_pressure_drop: f64,
    pub relief_bleed_per_tick: f64,
    pub pressure_low: f64,
    pub pressure_high: f64,

    pub shaft: ShaftParams,
    pub energy_interval_ticks: u32,

    #[serde(default)]
    pub initial: InitialSettings,
}

// Built-in tables. Step 0 is always the strongest setting.
const WATER_INTERVALS: [u32; 10] = [2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
const FIRE_INTERVALS: [u32; 4] = [2, 3, 4, 5];
const STEAM_INTERVALS: [u32; 4] = [2, 4, 8, 16];
const PRESSURE_GAIN: [f64; 4] = [4.0, 3.0, 2.0, 1.0];

fn table<T: Copy>(values: &[T]) -> RateTable<T> {
    RateTable {
        values: values.to_vec(),
    }
}

impl PlantProfile {
    /// Names of the built-in profiles.
    pub const BUILTIN: [&'static str; 2] = ["standard", "classic"];

    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::standard()),
            "classic" => Some(Self::classic()),
            _ => None,
        }
    }

    /// Fast-reacting plant with a fixed heating increment per fuel step.
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            description: "Fixed-step heating, quick boil, hot feed water".to_string(),
            water_interval_ticks: table(&WATER_INTERVALS),
            fire_interval_ticks: table(&FIRE_INTERVALS),
            steam_interval_ticks: table(&STEAM_INTERVALS),
            steam_pressure_gain: table(&PRESSURE_GAIN),
            heating: HeatingModel::FixedStep {
                increment_c: table(&[11.0, 9.0, 7.0, 5.0]),
            },
            water_to_steam_ratio: 20,
            mix_interval_ticks: 60,
            fuel_temp_interval_ticks: 30,
            cooling_interval_ticks: 120,
            cooling_constant: 0.03,
            ambient_temp_c: 75.0,
            valve_water_temp_c: 75.0,
            condenser_water_temp_c: 90.0,
            condense_interval_ticks: 2,
            condense_pressure_drop: 1.0,
            vent_pressure_drop: 1.0,
            relief_bleed_per_tick: 15.0,
            pressure_low: 300.0,
            pressure_high: 400.0,
            shaft: ShaftParams {
                spin_gain_rpm: 1000.0,
                friction_per_tick: 0.01,
                max_rpm: 60_000.0,
                bucket_thresholds_rpm: [5_000.0, 20_000.0, 40_000.0],
            },
            energy_interval_ticks: 10,
            initial: InitialSettings::default(),
        }
    }

    /// Calorimetric heating with cold feed water; slow to reach boiling.
    pub fn classic() -> Self {
        Self {
            name: "classic".to_string(),
            description: "Calorimetric heating (Q = m·c·ΔT), cold feed water".to_string(),
            heating: HeatingModel::Calorimetric {
                heat_j: table(&[60.0e6, 56.0e6, 52.0e6, 48.0e6]),
                mass_per_token_kg: 20.0,
                specific_heat_j_per_kg_k: 4186.0,
            },
            mix_interval_ticks: 1,
            fuel_temp_interval_ticks: 60,
            cooling_interval_ticks: 60,
            ambient_temp_c: 25.0,
            valve_water_temp_c: 20.0,
            condenser_water_temp_c: 32.0,
            ..Self::standard()
        }
    }

    /// Number of water-pump rate steps.
    pub fn water_steps(&self) -> u16 {
        clamp_steps(self.water_interval_ticks.len())
    }

    /// Number of fuel rate steps.
    pub fn fuel_steps(&self) -> u16 {
        clamp_steps(self.fire_interval_ticks.len())
    }

    pub fn validate(&self) -> SimResult<()> {
        let fuel = self.fire_interval_ticks.len();
        let water = self.water_interval_ticks.len();

        if water == 0 || fuel == 0 {
            return self.invalid("rate tables must not be empty");
        }
        if self.steam_interval_ticks.len() != fuel || self.steam_pressure_gain.len() != fuel {
            return self.invalid("steam tables must have one entry per fuel step");
        }
        let heat = match &self.heating {
            HeatingModel::FixedStep { increment_c } => increment_c,
            HeatingModel::Calorimetric {
                heat_j,
                mass_per_token_kg,
                specific_heat_j_per_kg_k,
            } => {
                let positive = |v: f64| v.is_finite() && v > 0.0;
                if !(positive(*mass_per_token_kg) && positive(*specific_heat_j_per_kg_k)) {
                    return self.invalid("mass and specific heat must be positive");
                }
                heat_j
            }
        };
        if heat.len() != fuel {
            return self.invalid("heating table must have one entry per fuel step");
        }
        if heat.values().iter().any(|v| !v.is_finite() || *v < 0.0) {
            return self.invalid("heating entries must be finite and non-negative");
        }
        if !(self.shaft.spin_gain_rpm.is_finite() && self.shaft.spin_gain_rpm >= 0.0) {
            return self.invalid("spin gain must be finite and non-negative");
        }

        let intervals = [
            self.mix_interval_ticks,
            self.fuel_temp_interval_ticks,
            self.cooling_interval_ticks,
            self.condense_interval_ticks,
            self.energy_interval_ticks,
            self.water_to_steam_ratio,
        ];
        let rate_intervals = self
            .water_interval_ticks
            .values()
            .iter()
            .chain(self.fire_interval_ticks.values())
            .chain(self.steam_interval_ticks.values());
        if intervals.iter().chain(rate_intervals).any(|&v| v == 0) {
            return self.invalid("intervals and ratios must be at least 1");
        }

        if !(0.0..1.0).contains(&self.cooling_constant) {
            return self.invalid("cooling constant must be within [0, 1)");
        }
        if !(0.0..1.0).contains(&self.shaft.friction_per_tick) {
            return self.invalid("shaft friction must be within [0, 1)");
        }
        let t = self.shaft.bucket_thresholds_rpm;
        if !(t[0] > 0.0 && t[0] < t[1] && t[1] < t[2] && self.shaft.max_rpm > 0.0) {
            return self.invalid("rpm thresholds must be positive and increasing");
        }
        if !(self.pressure_low >= 0.0 && self.pressure_low < self.pressure_high) {
            return self.invalid("pressure thresholds must satisfy 0 <= low < high");
        }
        let drops = [
            self.condense_pressure_drop,
            self.vent_pressure_drop,
            self.relief_bleed_per_tick,
        ];
        if drops
            .iter()
            .chain(self.steam_pressure_gain.values())
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return self.invalid("pressure gains and drops must be non-negative");
        }
        let temps = [
            self.ambient_temp_c,
            self.valve_water_temp_c,
            self.condenser_water_temp_c,
        ];
        if temps.iter().any(|t| !(0.0..=100.0).contains(t)) {
            return self.invalid("temperatures must be within [0, 100]");
        }
        if self.initial.water_step >= self.water_steps() || self.initial.fuel_step >= self.fuel_steps()
        {
            return self.invalid("initial rate steps out of range");
        }
        if self.initial.volume_low >= self.initial.volume_high {
            return self.invalid("initial low setpoint must be below high");
        }
        Ok(())
    }

    fn invalid(&self, what: &str) -> SimResult<()> {
        Err(SimError::InvalidProfile {
            profile: self.name.clone(),
            what: what.to_string(),
        })
    }
}

impl Default for PlantProfile {
    fn default() -> Self {
        Self::standard()
    }
}

fn clamp_steps(len: usize) -> u16 {
    u16::try_from(len).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_valid() {
        for name in PlantProfile::BUILTIN {
            let p = PlantProfile::builtin(name).unwrap();
            assert_eq!(p.name, name);
            p.validate().unwrap();
        }
        assert!(PlantProfile::builtin("nope").is_none());
    }

    #[test]
    fn step_counts() {
        let p = PlantProfile::standard();
        assert_eq!(p.water_steps(), 10);
        assert_eq!(p.fuel_steps(), 4);
    }

    #[test]
    fn rate_table_clamps_index() {
        let t = RateTable::new(vec![5u32, 6, 7]).unwrap();
        assert_eq!(t.at(0), 5);
        assert_eq!(t.at(2), 7);
        assert_eq!(t.at(9), 7);
        assert!(RateTable::<u32>::new(vec![]).is_err());
    }

    #[test]
    fn mismatched_tables_rejected() {
        let mut p = PlantProfile::standard();
        p.steam_interval_ticks = table(&[2, 4]);
        assert!(matches!(p.validate(), Err(SimError::InvalidProfile { .. })));

        let mut p = PlantProfile::standard();
        p.heating = HeatingModel::FixedStep {
            increment_c: table(&[11.0, 9.0]),
        };
        assert!(matches!(p.validate(), Err(SimError::InvalidProfile { .. })));
    }

    #[test]
    fn bad_heating_entries_rejected() {
        for bad in [f64::NAN, f64::INFINITY, -20.0] {
            let mut p = PlantProfile::standard();
            p.heating = HeatingModel::FixedStep {
                increment_c: table(&[bad, 9.0, 7.0, 5.0]),
            };
            assert!(
                matches!(p.validate(), Err(SimError::InvalidProfile { .. })),
                "increment {bad} accepted"
            );

            let mut p = PlantProfile::classic();
            p.heating = HeatingModel::Calorimetric {
                heat_j: table(&[60.0e6, bad, 52.0e6, 48.0e6]),
                mass_per_token_kg: 20.0,
                specific_heat_j_per_kg_k: 4186.0,
            };
            assert!(p.validate().is_err(), "heat {bad} accepted");
        }

        let mut p = PlantProfile::classic();
        p.heating = HeatingModel::Calorimetric {
            heat_j: table(&[60.0e6, 56.0e6, 52.0e6, 48.0e6]),
            mass_per_token_kg: f64::NAN,
            specific_heat_j_per_kg_k: 4186.0,
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn zero_interval_rejected() {
        let mut p = PlantProfile::standard();
        p.condense_interval_ticks = 0;
        assert!(p.validate().is_err());

        let mut p = PlantProfile::standard();
        p.water_interval_ticks = table(&[0, 1]);
        assert!(p.validate().is_err());

        for bad in [f64::NAN, -1.0] {
            let mut p = PlantProfile::standard();
            p.shaft.spin_gain_rpm = bad;
            assert!(p.validate().is_err(), "spin gain {bad} accepted");
        }
    }

    #[test]
    fn inverted_pressure_thresholds_rejected() {
        let mut p = PlantProfile::standard();
        p.pressure_low = 500.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn yaml_round_trip_preserves_profile() {
        let p = PlantProfile::classic();
        let text = serde_yaml::to_string(&p).unwrap();
        assert!(text.contains("model: calorimetric"));
        let back: PlantProfile = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, p);
    }
}
