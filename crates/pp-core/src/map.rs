//! Register address map of the plant.
//!
//! Addresses are a deployment convention shared with the operator consoles,
//! not something the protocol mandates. Roles are informational only: the
//! protocol never refuses a write because of a register's role.

/// Register address as carried on the wire.
pub type Address = u16;

pub const WATER_PUMP_VALVE: Address = 0x01;
pub const WATER_PUMP_RATE: Address = 0x02;
pub const FUEL_VALVE: Address = 0x03;
pub const FUEL_RATE: Address = 0x04;
pub const BOILER_STATE: Address = 0x05;
pub const BOILER_TEMP: Address = 0x06;
pub const BOILER_WATER_VOLUME: Address = 0x07;
pub const BOILER_VOLUME_LOW: Address = 0x08;
pub const BOILER_VOLUME_HIGH: Address = 0x09;
pub const CONDENSER_VALVE: Address = 0x0a;
pub const CONDENSER_WATER_VOLUME: Address = 0x0b;
pub const TURBINE_PRESSURE_HIGH: Address = 0x0c;
pub const TURBINE_PRESSURE: Address = 0x0d;
pub const GENERATOR_STATUS: Address = 0x0e;
pub const GENERATOR_OUTPUT: Address = 0x0f;
pub const PYLON_STATUS: Address = 0x10;
pub const TURBINE_RPM: Address = 0x11;
pub const PYLON_POWER: Address = 0x12;
pub const BOILER_NEED_WATER: Address = 0x13;
pub const BOILER_STOP_WATER: Address = 0x14;

/// Who is expected to write a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RegisterRole {
    /// Written by consoles, read by the simulator.
    Command,
    /// Written by the simulator, read by consoles.
    Sensor,
    /// Nudged by consoles with small deltas, integrated by the simulator.
    Setpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDescriptor {
    pub address: Address,
    pub name: &'static str,
    pub role: RegisterRole,
}

const fn reg(address: Address, name: &'static str, role: RegisterRole) -> RegisterDescriptor {
    RegisterDescriptor {
        address,
        name,
        role,
    }
}

/// Every named register, in address order.
pub const REGISTERS: &[RegisterDescriptor] = &[
    reg(WATER_PUMP_VALVE, "water_pump_valve", RegisterRole::Command),
    reg(WATER_PUMP_RATE, "water_pump_rate", RegisterRole::Command),
    reg(FUEL_VALVE, "fuel_valve", RegisterRole::Command),
    reg(FUEL_RATE, "fuel_rate", RegisterRole::Command),
    reg(BOILER_STATE, "boiler_state", RegisterRole::Sensor),
    reg(BOILER_TEMP, "boiler_temp", RegisterRole::Sensor),
    reg(BOILER_WATER_VOLUME, "boiler_water_volume", RegisterRole::Sensor),
    reg(BOILER_VOLUME_LOW, "boiler_volume_low", RegisterRole::Setpoint),
    reg(BOILER_VOLUME_HIGH, "boiler_volume_high", RegisterRole::Setpoint),
    reg(CONDENSER_VALVE, "condenser_valve", RegisterRole::Command),
    reg(CONDENSER_WATER_VOLUME, "condenser_water_volume", RegisterRole::Sensor),
    reg(TURBINE_PRESSURE_HIGH, "turbine_pressure_high", RegisterRole::Sensor),
    reg(TURBINE_PRESSURE, "turbine_pressure", RegisterRole::Sensor),
    reg(GENERATOR_STATUS, "generator_status", RegisterRole::Command),
    reg(GENERATOR_OUTPUT, "generator_output", RegisterRole::Sensor),
    reg(PYLON_STATUS, "pylon_status", RegisterRole::Command),
    reg(TURBINE_RPM, "turbine_rpm", RegisterRole::Sensor),
    reg(PYLON_POWER, "pylon_power", RegisterRole::Sensor),
    reg(BOILER_NEED_WATER, "boiler_need_water", RegisterRole::Sensor),
    reg(BOILER_STOP_WATER, "boiler_stop_water", RegisterRole::Sensor),
];

/// Look up the descriptor of an address, if it is part of the map.
pub fn describe(address: Address) -> Option<&'static RegisterDescriptor> {
    REGISTERS.iter().find(|d| d.address == address)
}

/// Look up an address by its snake_case name.
pub fn address_of(name: &str) -> Option<Address> {
    REGISTERS.iter().find(|d| d.name == name).map(|d| d.address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_is_sorted_and_unique() {
        for pair in REGISTERS.windows(2) {
            assert!(pair[0].address < pair[1].address, "{:?}", pair);
        }
    }

    #[test]
    fn names_resolve_both_ways() {
        for d in REGISTERS {
            assert_eq!(address_of(d.name), Some(d.address));
            assert_eq!(describe(d.address).map(|x| x.name), Some(d.name));
        }
        assert!(describe(0x1f).is_none());
    }

    #[test]
    fn map_fits_a_console_poll() {
        // Consoles read 24 registers starting at address 1.
        let last = REGISTERS.last().map(|d| d.address).unwrap_or(0);
        assert!(last <= 24);
    }
}
