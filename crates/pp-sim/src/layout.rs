//! Plant geometry.
//!
//! The world is a 600×600 box with y pointing up. Each zone is an
//! axis-aligned rectangle, half-open on its upper edges so neighbouring
//! zones never both claim a token. Positions only answer "which zone is this
//! token in"; nothing is rendered from them here.
//!
//! ```text
//!  y
//! 600 +---------------------------------------------+
//!     |                                  +--------+ |
//! 545 | +-------- TURBINE ---------+     | PYLON  | |
//! 465 | +--------------------------+     |        | |
//!     |  riser   |    | CONDENSER  |     +--------+ | 300
//! 300 | +BOILER-+|gap |   (190-250)|                |
//! 170 | +-------+|    +------------+ 260            |
//! 120 | BURNER                                      |
//!   0 +---------------------------------------------+ x
//! ```

use pp_core::Real;
use serde::{Deserialize, Serialize};

pub const WORLD_WIDTH: Real = 600.0;
pub const WORLD_HEIGHT: Real = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: Real,
    pub y: Real,
}

impl Point {
    pub const fn new(x: Real, y: Real) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: Real,
    pub y0: Real,
    pub x1: Real,
    pub y1: Real,
}

impl Rect {
    pub const fn new(x0: Real, y0: Real, x1: Real, y1: Real) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x0 && p.x < self.x1 && p.y >= self.y0 && p.y < self.y1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Burner,
    Boiler,
    Condenser,
    Turbine,
    Pylon,
}

impl Zone {
    pub const ALL: [Zone; 5] = [
        Zone::Burner,
        Zone::Boiler,
        Zone::Condenser,
        Zone::Turbine,
        Zone::Pylon,
    ];

    pub fn bounds(self) -> Rect {
        match self {
            Zone::Burner => BURNER,
            Zone::Boiler => BOILER,
            Zone::Condenser => CONDENSER,
            Zone::Turbine => TURBINE,
            Zone::Pylon => PYLON,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// The zone containing `p`, if any. Zones do not overlap.
    pub fn locate(p: Point) -> Option<Zone> {
        Zone::ALL.into_iter().find(|z| z.bounds().contains(p))
    }
}

pub const BURNER: Rect = Rect::new(12.0, 120.0, 182.0, 170.0);
pub const BOILER: Rect = Rect::new(12.0, 170.0, 184.0, 300.0);
pub const TURBINE: Rect = Rect::new(12.0, 465.0, 240.0, 545.0);
pub const CONDENSER: Rect = Rect::new(190.0, 260.0, 250.0, 465.0);
pub const PYLON: Rect = Rect::new(480.0, 300.0, 600.0, 500.0);

/// Left edge of the condenser outlet valve gap.
pub const VALVE_GAP_X: Real = 184.0;

pub const BOILER_FLOOR_Y: Real = BOILER.y0;
pub const CONDENSER_FLOOR_Y: Real = CONDENSER.y0;
/// Height at which steam runs along the turbine toward the condenser.
pub const TURBINE_RUN_Y: Real = 505.0;
/// x at which steam leaves the turbine and drops into the condenser.
pub const TURBINE_EXIT_X: Real = TURBINE.x1;
/// Height at which steam settles in the condenser.
pub const CONDENSER_REST_Y: Real = 270.0;

pub const PUMP_OUTLET: Point = Point::new(100.0, 348.0);
pub const BURNER_X: [Real; 3] = [37.0, 97.0, 160.0];
pub const BURNER_Y: Real = 134.0;
pub const STEAM_SPAWN_Y: Real = 280.0;
pub const ENERGY_SPAWN_Y: Real = 490.0;

/// Deterministic horizontal scatter so tokens spawned at one source do not
/// stack on a single point.
pub fn spread(serial: u64, center: Real, half_width: Real) -> Real {
    const SLOTS: u64 = 9;
    let slot = (serial % SLOTS) as Real;
    let unit = slot / (SLOTS - 1) as Real;
    center - half_width + 2.0 * half_width * unit
}

pub fn in_world(p: Point) -> bool {
    (0.0..WORLD_WIDTH).contains(&p.x) && (0.0..WORLD_HEIGHT).contains(&p.y)
}
