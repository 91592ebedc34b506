//! Turbine shaft speed.

use pp_core::Real;

use crate::error::{SimError, SimResult};
use crate::profile::ShaftParams;

/// Turbine shaft driven by steam arrivals with viscous friction.
///
/// Per tick:
///
/// ```text
/// rpm' = rpm + spin_gain · arrivals − friction · rpm
/// ```
///
/// clamped to `[0, max_rpm]`. The published speed is a coarse level 0..=3
/// read off fixed thresholds.
#[derive(Clone, Debug)]
pub struct TurbineShaft {
    params: ShaftParams,
    rpm: Real,
}

impl TurbineShaft {
    pub fn new(params: ShaftParams) -> SimResult<Self> {
        if !(params.spin_gain_rpm.is_finite() && params.spin_gain_rpm >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "spin gain must be finite and non-negative",
            });
        }
        if !(0.0..1.0).contains(&params.friction_per_tick) {
            return Err(SimError::InvalidArg {
                what: "shaft friction must be within [0, 1)",
            });
        }
        if params.max_rpm <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "max rpm must be positive",
            });
        }
        Ok(Self { params, rpm: 0.0 })
    }

    pub fn rpm(&self) -> Real {
        self.rpm
    }

    /// Advance one tick given the number of steam tokens that entered the
    /// turbine.
    pub fn step(&mut self, arrivals: usize) -> Real {
        let drive = self.params.spin_gain_rpm * arrivals as Real;
        let friction = self.params.friction_per_tick * self.rpm;
        self.rpm = (self.rpm + drive - friction).clamp(0.0, self.params.max_rpm);
        self.rpm
    }

    /// Output level 0..=3.
    pub fn bucket(&self) -> u16 {
        bucket(self.rpm, &self.params.bucket_thresholds_rpm)
    }
}

pub fn bucket(rpm: Real, thresholds: &[Real; 3]) -> u16 {
    thresholds.iter().filter(|&&t| rpm >= t).count() as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PlantProfile;

    fn shaft() -> TurbineShaft {
        TurbineShaft::new(PlantProfile::standard().shaft).unwrap()
    }

    #[test]
    fn invalid_params() {
        let mut p = PlantProfile::standard().shaft;
        p.friction_per_tick = 1.0;
        assert!(TurbineShaft::new(p).is_err());

        let mut p = PlantProfile::standard().shaft;
        p.max_rpm = 0.0;
        assert!(TurbineShaft::new(p).is_err());

        let mut p = PlantProfile::standard().shaft;
        p.spin_gain_rpm = f64::NAN;
        assert!(TurbineShaft::new(p).is_err());
    }

    #[test]
    fn spins_up_on_arrivals() {
        let mut s = shaft();
        assert_eq!(s.step(1), 1000.0);
        // friction takes 1% before the next arrival adds
        assert!((s.step(1) - 1990.0).abs() < 1e-9);
    }

    #[test]
    fn friction_spins_down() {
        let mut s = shaft();
        s.step(20);
        let mut prev = s.rpm();
        for _ in 0..100 {
            let rpm = s.step(0);
            assert!(rpm < prev);
            prev = rpm;
        }
        assert!(prev > 0.0);
    }

    #[test]
    fn clamps_at_max() {
        let mut s = shaft();
        assert_eq!(s.step(1_000), 60_000.0);
        assert_eq!(s.bucket(), 3);
    }

    #[test]
    fn steady_state_tracks_arrival_rate() {
        // one arrival every other tick settles near gain / (2·friction)
        let mut s = shaft();
        for i in 0..5_000 {
            s.step(usize::from(i % 2 == 0));
        }
        assert!((45_000.0..55_000.0).contains(&s.rpm()));
        assert_eq!(s.bucket(), 3);
    }

    #[test]
    fn bucket_thresholds() {
        let t = [5_000.0, 20_000.0, 40_000.0];
        assert_eq!(bucket(0.0, &t), 0);
        assert_eq!(bucket(4_999.0, &t), 0);
        assert_eq!(bucket(5_000.0, &t), 1);
        assert_eq!(bucket(25_000.0, &t), 2);
        assert_eq!(bucket(40_000.0, &t), 3);
    }
}
