//! Query helpers for consoles: register dumps, status decoding, addresses.

use pp_core::map;
use pp_modbus::RegisterClient;
use pp_sim::PlantStatus;
use pp_sim::status::STATUS_FIRST;
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// One register in a dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterEntry {
    pub address: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    pub value: u16,
}

/// Label values read from `start` with their map names.
pub fn register_dump(start: u16, values: &[u16]) -> Vec<RegisterEntry> {
    values
        .iter()
        .zip(start..)
        .map(|(&value, address)| RegisterEntry {
            address,
            name: map::describe(address).map(|d| d.name),
            value,
        })
        .collect()
}

pub fn dump_json(entries: &[RegisterEntry]) -> AppResult<String> {
    serde_json::to_string_pretty(entries)
        .map_err(|e| AppError::InvalidInput(format!("Failed to encode registers: {}", e)))
}

pub fn status_json(status: &PlantStatus) -> AppResult<String> {
    serde_json::to_string_pretty(status)
        .map_err(|e| AppError::InvalidInput(format!("Failed to encode status: {}", e)))
}

/// Read and decode the plant status from a running server.
pub async fn read_status(client: &mut RegisterClient) -> AppResult<PlantStatus> {
    let regs = client
        .read_holding(STATUS_FIRST, PlantStatus::SPAN as u16)
        .await?;
    Ok(PlantStatus::from_registers(&regs)?)
}

/// Parse a register address: decimal, `0x` hex, or a map name such as
/// `turbine_pressure`.
pub fn parse_address(text: &str) -> AppResult<u16> {
    let text = text.trim();
    if let Some(address) = map::address_of(&text.to_ascii_lowercase()) {
        return Ok(address);
    }
    parse_u16(text)
        .ok_or_else(|| AppError::InvalidInput(format!("Not a register address: {}", text)))
}

/// Parse a register value: decimal or `0x` hex.
pub fn parse_value(text: &str) -> AppResult<u16> {
    parse_u16(text.trim())
        .ok_or_else(|| AppError::InvalidInput(format!("Not a 16-bit value: {}", text)))
}

fn parse_u16(text: &str) -> Option<u16> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Human-readable status, one quantity per line.
pub fn format_status(s: &PlantStatus) -> String {
    let lines = [
        format!(
            "water pump      {:<4} step {}",
            on_off(s.water_pump_valve.is_on()),
            s.water_pump_step
        ),
        format!(
            "fuel            {:<4} step {}",
            on_off(s.fuel_valve.is_on()),
            s.fuel_step
        ),
        format!(
            "boiler          {:?}, {} C, volume {} (low {}, high {})",
            s.boiler_state, s.boiler_temp_c, s.boiler_volume, s.volume_low, s.volume_high
        ),
        format!(
            "boiler alarms   need water {}, stop water {}",
            on_off(s.need_water),
            on_off(s.stop_water)
        ),
        format!(
            "condenser       {:<4} volume {}",
            on_off(s.condenser_valve.is_on()),
            s.condenser_volume
        ),
        format!(
            "turbine         pressure {}, relief {:?}, rpm level {}",
            s.turbine_pressure, s.relief, s.rpm_level
        ),
        format!(
            "generator       {:<4} output {}",
            on_off(s.generator.is_on()),
            s.generator_output
        ),
        format!(
            "pylon           {:<4} power {}",
            on_off(s.pylon.is_on()),
            s.pylon_power
        ),
    ];
    lines.join("\n")
}
