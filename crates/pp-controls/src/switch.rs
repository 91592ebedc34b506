//! Two-position switches: valves, generator breaker, pylon feed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Switch {
    #[default]
    Off,
    On,
}

impl Switch {
    /// Any non-zero register value means on.
    pub fn from_register(raw: u16) -> Self {
        if raw == 0 { Switch::Off } else { Switch::On }
    }

    pub fn is_on(self) -> bool {
        matches!(self, Switch::On)
    }

    pub fn to_register(self) -> u16 {
        u16::from(self.is_on())
    }
}
