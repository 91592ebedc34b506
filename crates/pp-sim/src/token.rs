//! Flow tokens: discrete units of water, steam, fire and electrical energy.
//!
//! Tokens move by a fixed drift per tick that depends only on their kind,
//! their position and a couple of plant switches. Zone membership is a
//! bounding-box test on the position after drift.

use pp_core::{TokenId, TokenIdAllocator};
use serde::{Deserialize, Serialize};

use crate::layout::{
    self, CONDENSER, CONDENSER_FLOOR_Y, CONDENSER_REST_Y, BOILER_FLOOR_Y, Point, TURBINE_EXIT_X,
    TURBINE_RUN_Y, VALVE_GAP_X, Zone,
};

const WATER_FALL: f64 = 6.0;
const WATER_DRAIN: f64 = 4.0;
const STEAM_RISE: f64 = 5.0;
const STEAM_RUN: f64 = 4.0;
const STEAM_SETTLE: f64 = 5.0;
const VENT_RISE: f64 = 8.0;
const FIRE_RISE: f64 = 2.0;
const ENERGY_FALL: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Water,
    Steam,
    Fire,
    Energy,
}

impl TokenKind {
    pub const ALL: [TokenKind; 4] = [
        TokenKind::Water,
        TokenKind::Steam,
        TokenKind::Fire,
        TokenKind::Energy,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Where a water token came from; decides its temperature when mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    #[default]
    None,
    FromValve,
    FromCondenserReturn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowToken {
    pub id: TokenId,
    pub kind: TokenKind,
    pub position: Point,
    pub provenance: Provenance,
    /// Steam released through the relief outlet.
    pub vented: bool,
}

impl FlowToken {
    pub fn zone(&self) -> Option<Zone> {
        Zone::locate(self.position)
    }

    /// Steam that has reached the bottom of the condenser.
    pub fn is_condensable(&self) -> bool {
        self.kind == TokenKind::Steam
            && !self.vented
            && self.zone() == Some(Zone::Condenser)
            && self.position.y <= CONDENSER_REST_Y
    }

    fn drift(&mut self, condenser_open: bool) {
        let p = &mut self.position;
        match self.kind {
            TokenKind::Water if p.x >= VALVE_GAP_X => {
                p.y = (p.y - WATER_FALL).max(CONDENSER_FLOOR_Y);
                let resting = p.y <= CONDENSER_FLOOR_Y;
                if condenser_open && resting {
                    p.x -= WATER_DRAIN;
                } else if !condenser_open {
                    p.x = p.x.max(CONDENSER.x0);
                }
            }
            TokenKind::Water => {
                p.y = (p.y - WATER_FALL).max(BOILER_FLOOR_Y);
            }
            TokenKind::Steam if self.vented => p.y += VENT_RISE,
            TokenKind::Steam if p.x < TURBINE_EXIT_X => {
                if p.y < TURBINE_RUN_Y {
                    p.y = (p.y + STEAM_RISE).min(TURBINE_RUN_Y);
                } else {
                    p.x += STEAM_RUN;
                }
            }
            TokenKind::Steam => {
                p.y = (p.y - STEAM_SETTLE).max(CONDENSER_REST_Y);
            }
            TokenKind::Fire => p.y += FIRE_RISE,
            TokenKind::Energy => p.y -= ENERGY_FALL,
        }
    }

    fn expired(&self) -> bool {
        if !layout::in_world(self.position) {
            return true;
        }
        match self.kind {
            TokenKind::Fire => self.zone() != Some(Zone::Burner),
            TokenKind::Energy => self.zone() != Some(Zone::Pylon),
            _ => false,
        }
    }
}

/// Live counts per zone and kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneCounts {
    counts: [[usize; 4]; 5],
}

impl ZoneCounts {
    pub fn get(&self, zone: Zone, kind: TokenKind) -> usize {
        self.counts[zone.index()][kind.index()]
    }

    pub fn total(&self, zone: Zone) -> usize {
        self.counts[zone.index()].iter().sum()
    }

    fn add(&mut self, zone: Zone, kind: TokenKind) {
        self.counts[zone.index()][kind.index()] += 1;
    }
}

/// What happened during one drift pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriftReport {
    /// Steam tokens that crossed into the turbine.
    pub turbine_arrivals: usize,
    pub retired: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TokenPool {
    tokens: Vec<FlowToken>,
    ids: TokenIdAllocator,
}

impl TokenPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, kind: TokenKind, position: Point, provenance: Provenance) -> TokenId {
        let id = self.ids.allocate();
        self.tokens.push(FlowToken {
            id,
            kind,
            position,
            provenance,
            vented: false,
        });
        id
    }

    /// Serial the next spawned token will get.
    pub fn next_serial(&self) -> u64 {
        self.ids.issued()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlowToken> {
        self.tokens.iter()
    }

    pub fn count(&self, zone: Zone, kind: TokenKind) -> usize {
        self.tokens
            .iter()
            .filter(|t| t.kind == kind && t.zone() == Some(zone))
            .count()
    }

    pub fn zone_counts(&self) -> ZoneCounts {
        let mut counts = ZoneCounts::default();
        for t in &self.tokens {
            if let Some(zone) = t.zone() {
                counts.add(zone, t.kind);
            }
        }
        counts
    }

    /// Move every token one tick and retire those that left their life zone
    /// or the world.
    pub fn drift(&mut self, condenser_open: bool) -> DriftReport {
        let mut report = DriftReport::default();
        for t in &mut self.tokens {
            let was_in_turbine = t.zone() == Some(Zone::Turbine);
            t.drift(condenser_open);
            if t.kind == TokenKind::Steam
                && !t.vented
                && !was_in_turbine
                && t.zone() == Some(Zone::Turbine)
            {
                report.turbine_arrivals += 1;
            }
        }
        let before = self.tokens.len();
        self.tokens.retain(|t| !t.expired());
        report.retired = before - self.tokens.len();
        report
    }

    /// Clear the provenance of water that has reached the boiler and return
    /// the tags it carried.
    pub fn claim_boiler_arrivals(&mut self) -> Vec<Provenance> {
        let mut arrivals = Vec::new();
        for t in &mut self.tokens {
            if t.kind == TokenKind::Water
                && t.provenance != Provenance::None
                && t.zone() == Some(Zone::Boiler)
            {
                arrivals.push(std::mem::take(&mut t.provenance));
            }
        }
        arrivals
    }

    /// Retire the oldest token matching `pred`. Returns `false` if none did.
    pub fn retire_first(&mut self, pred: impl Fn(&FlowToken) -> bool) -> bool {
        match self.tokens.iter().position(pred) {
            Some(idx) => {
                self.tokens.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Send all steam currently in the turbine out of the relief outlet.
    pub fn vent_turbine_steam(&mut self) -> usize {
        let mut vented = 0;
        for t in &mut self.tokens {
            if t.kind == TokenKind::Steam && !t.vented && t.zone() == Some(Zone::Turbine) {
                t.vented = true;
                vented += 1;
            }
        }
        vented
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BURNER_X, BURNER_Y, PUMP_OUTLET, STEAM_SPAWN_Y};

    fn run(pool: &mut TokenPool, ticks: usize, condenser_open: bool) -> DriftReport {
        let mut total = DriftReport::default();
        for _ in 0..ticks {
            let r = pool.drift(condenser_open);
            total.turbine_arrivals += r.turbine_arrivals;
            total.retired += r.retired;
        }
        total
    }

    #[test]
    fn pumped_water_settles_in_boiler() {
        let mut pool = TokenPool::new();
        pool.spawn(TokenKind::Water, PUMP_OUTLET, Provenance::FromValve);
        assert_eq!(pool.count(Zone::Boiler, TokenKind::Water), 0);
        run(&mut pool, 40, false);
        assert_eq!(pool.count(Zone::Boiler, TokenKind::Water), 1);

        let arrivals = pool.claim_boiler_arrivals();
        assert_eq!(arrivals, vec![Provenance::FromValve]);
        assert!(pool.claim_boiler_arrivals().is_empty());
    }

    #[test]
    fn steam_travels_boiler_turbine_condenser() {
        let mut pool = TokenPool::new();
        pool.spawn(TokenKind::Steam, Point::new(100.0, STEAM_SPAWN_Y), Provenance::None);

        let r = run(&mut pool, 60, false);
        assert_eq!(r.turbine_arrivals, 1);
        assert_eq!(pool.count(Zone::Turbine, TokenKind::Steam), 1);

        let r = run(&mut pool, 200, false);
        assert_eq!(r.turbine_arrivals, 0);
        assert_eq!(pool.count(Zone::Condenser, TokenKind::Steam), 1);
        assert!(pool.iter().all(FlowToken::is_condensable));
    }

    #[test]
    fn condenser_water_drains_only_when_open() {
        let mut pool = TokenPool::new();
        pool.spawn(
            TokenKind::Water,
            Point::new(220.0, CONDENSER_FLOOR_Y),
            Provenance::FromCondenserReturn,
        );
        run(&mut pool, 100, false);
        assert_eq!(pool.count(Zone::Condenser, TokenKind::Water), 1);

        run(&mut pool, 100, true);
        assert_eq!(pool.count(Zone::Condenser, TokenKind::Water), 0);
        assert_eq!(pool.count(Zone::Boiler, TokenKind::Water), 1);
        assert_eq!(
            pool.claim_boiler_arrivals(),
            vec![Provenance::FromCondenserReturn]
        );
    }

    #[test]
    fn fire_burns_out_above_burner() {
        let mut pool = TokenPool::new();
        pool.spawn(TokenKind::Fire, Point::new(BURNER_X[1], BURNER_Y), Provenance::None);
        assert_eq!(pool.count(Zone::Burner, TokenKind::Fire), 1);
        let r = run(&mut pool, 30, false);
        assert_eq!(r.retired, 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn vented_steam_leaves_the_world() {
        let mut pool = TokenPool::new();
        pool.spawn(TokenKind::Steam, Point::new(50.0, 480.0), Provenance::None);
        assert_eq!(pool.vent_turbine_steam(), 1);
        assert_eq!(pool.vent_turbine_steam(), 0);
        run(&mut pool, 30, false);
        assert!(pool.is_empty());
    }

    #[test]
    fn retire_first_takes_oldest_match() {
        let mut pool = TokenPool::new();
        let a = pool.spawn(TokenKind::Water, Point::new(50.0, 180.0), Provenance::None);
        let b = pool.spawn(TokenKind::Water, Point::new(60.0, 180.0), Provenance::None);
        assert!(pool.retire_first(|t| t.zone() == Some(Zone::Boiler)));
        assert_eq!(pool.iter().map(|t| t.id).collect::<Vec<_>>(), vec![b]);
        assert_ne!(a, b);
        assert!(!pool.retire_first(|t| t.kind == TokenKind::Steam));
    }

    #[test]
    fn zone_counts_match_per_zone_queries() {
        let mut pool = TokenPool::new();
        for i in 0..5 {
            pool.spawn(
                TokenKind::Water,
                Point::new(30.0 + i as f64, 180.0),
                Provenance::None,
            );
        }
        pool.spawn(TokenKind::Energy, Point::new(540.0, 490.0), Provenance::None);
        let counts = pool.zone_counts();
        for zone in Zone::ALL {
            for kind in TokenKind::ALL {
                assert_eq!(counts.get(zone, kind), pool.count(zone, kind));
            }
        }
        assert_eq!(counts.total(Zone::Boiler), 5);
        assert_eq!(counts.get(Zone::Pylon, TokenKind::Energy), 1);
    }
}
