//! Plant status as an operator console sees it.

use pp_controls::{RATE_BIAS, ReliefState, SETPOINT_BIAS, Switch};
use pp_core::{CoreError, CoreResult, Real, map};
use serde::{Deserialize, Serialize};

use crate::thermal::BoilerState;

/// Decoded view of the plant's registers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantStatus {
    pub water_pump_valve: Switch,
    pub water_pump_step: u16,
    pub fuel_valve: Switch,
    pub fuel_step: u16,
    pub boiler_state: BoilerState,
    pub boiler_temp_c: Real,
    pub boiler_volume: u16,
    pub volume_low: u16,
    pub volume_high: u16,
    pub condenser_valve: Switch,
    pub condenser_volume: u16,
    pub relief: ReliefState,
    pub turbine_pressure: u16,
    pub generator: Switch,
    pub generator_output: u16,
    pub pylon: Switch,
    pub rpm_level: u16,
    pub pylon_power: u16,
    pub need_water: bool,
    pub stop_water: bool,
}

/// Lowest and highest address a console poll has to cover.
pub const STATUS_FIRST: map::Address = map::WATER_PUMP_VALVE;
pub const STATUS_LAST: map::Address = map::BOILER_STOP_WATER;

impl PlantStatus {
    /// Number of registers [`PlantStatus::from_registers`] expects.
    pub const SPAN: usize = (STATUS_LAST - STATUS_FIRST + 1) as usize;

    /// Decode registers read starting at [`STATUS_FIRST`].
    ///
    /// Rate and setpoint words that are not canonically encoded (a console
    /// delta code not yet corrected by a tick) decode as step/value 0.
    pub fn from_registers(regs: &[u16]) -> CoreResult<Self> {
        if regs.len() < Self::SPAN {
            return Err(CoreError::InvalidArg {
                what: "status decode needs registers 0x01..=0x14",
            });
        }
        let at = |addr: map::Address| regs[usize::from(addr - STATUS_FIRST)];
        let switch = |addr| Switch::from_register(at(addr));
        let flag = |addr| at(addr) != 0;
        let biased = |addr, bias: u16| at(addr).saturating_sub(bias);

        let relief = if flag(map::TURBINE_PRESSURE_HIGH) {
            ReliefState::Releasing
        } else {
            ReliefState::Normal
        };

        Ok(Self {
            water_pump_valve: switch(map::WATER_PUMP_VALVE),
            water_pump_step: biased(map::WATER_PUMP_RATE, RATE_BIAS),
            fuel_valve: switch(map::FUEL_VALVE),
            fuel_step: biased(map::FUEL_RATE, RATE_BIAS),
            boiler_state: BoilerState::from_register(at(map::BOILER_STATE))
                .unwrap_or(BoilerState::Empty),
            boiler_temp_c: Real::from(at(map::BOILER_TEMP)),
            boiler_volume: at(map::BOILER_WATER_VOLUME),
            volume_low: biased(map::BOILER_VOLUME_LOW, SETPOINT_BIAS),
            volume_high: biased(map::BOILER_VOLUME_HIGH, SETPOINT_BIAS),
            condenser_valve: switch(map::CONDENSER_VALVE),
            condenser_volume: at(map::CONDENSER_WATER_VOLUME),
            relief,
            turbine_pressure: at(map::TURBINE_PRESSURE),
            generator: switch(map::GENERATOR_STATUS),
            generator_output: at(map::GENERATOR_OUTPUT),
            pylon: switch(map::PYLON_STATUS),
            rpm_level: at(map::TURBINE_RPM),
            pylon_power: at(map::PYLON_POWER),
            need_water: flag(map::BOILER_NEED_WATER),
            stop_water: flag(map::BOILER_STOP_WATER),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_covers_the_map() {
        assert_eq!(PlantStatus::SPAN, 20);
    }

    #[test]
    fn decode_biased_and_flag_registers() {
        let mut regs = vec![0u16; PlantStatus::SPAN];
        let mut put = |addr: map::Address, v: u16| regs[usize::from(addr - STATUS_FIRST)] = v;
        put(map::WATER_PUMP_VALVE, 5);
        put(map::WATER_PUMP_RATE, 5);
        put(map::FUEL_RATE, 3);
        put(map::BOILER_STATE, 2);
        put(map::BOILER_TEMP, 100);
        put(map::BOILER_VOLUME_LOW, 13);
        put(map::BOILER_VOLUME_HIGH, 103);
        put(map::TURBINE_PRESSURE_HIGH, 1);
        put(map::TURBINE_PRESSURE, 412);
        put(map::BOILER_STOP_WATER, 1);

        let s = PlantStatus::from_registers(&regs).unwrap();
        assert_eq!(s.water_pump_valve, Switch::On);
        assert_eq!(s.water_pump_step, 2);
        assert_eq!(s.fuel_step, 0);
        assert_eq!(s.boiler_state, BoilerState::Boiling);
        assert_eq!(s.boiler_temp_c, 100.0);
        assert_eq!((s.volume_low, s.volume_high), (10, 100));
        assert_eq!(s.relief, ReliefState::Releasing);
        assert_eq!(s.turbine_pressure, 412);
        assert!(s.stop_water);
        assert!(!s.need_water);
    }

    #[test]
    fn short_slice_is_rejected() {
        assert!(PlantStatus::from_registers(&[0; 10]).is_err());
    }
}
