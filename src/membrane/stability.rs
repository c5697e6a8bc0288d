//! CFL stability gate and divergence guard.

use serde::{Deserialize, Serialize};

use crate::error::MembraneError;

/// Largest CFL number the explicit 5-point scheme is run at by default.
pub const DEFAULT_CFL_LIMIT: f64 = 0.25;

/// Displacement magnitude treated as a blown-up simulation.
pub const DEFAULT_DIVERGENCE_LIMIT: f64 = 1.0e6;

/// `c · dt / h`.
pub fn courant_number(wave_speed: f64, dt: f64, h: f64) -> f64 {
    wave_speed * dt / h
}

/// Limits a solver is held to: the CFL number at construction and the
/// field magnitude after every step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityPolicy {
    pub cfl_limit: f64,
    pub divergence_limit: f64,
}

impl Default for StabilityPolicy {
    fn default() -> Self {
        StabilityPolicy {
            cfl_limit: DEFAULT_CFL_LIMIT,
            divergence_limit: DEFAULT_DIVERGENCE_LIMIT,
        }
    }
}

impl StabilityPolicy {
    pub fn is_stable(&self, ratio: f64) -> bool {
        ratio.is_finite() && ratio > 0.0 && ratio <= self.cfl_limit
    }

    /// Compute the CFL number for `(c, dt, h)` and reject it if the scheme
    /// would not be stable.
    pub fn check(&self, wave_speed: f64, dt: f64, h: f64) -> Result<f64, MembraneError> {
        if !(self.cfl_limit.is_finite() && self.cfl_limit > 0.0) {
            return Err(MembraneError::invalid(
                "cfl_limit",
                format!("must be positive and finite, got {}", self.cfl_limit),
            ));
        }
        if !(self.divergence_limit > 0.0) {
            return Err(MembraneError::invalid(
                "divergence_limit",
                format!("must be positive, got {}", self.divergence_limit),
            ));
        }
        let ratio = courant_number(wave_speed, dt, h);
        if self.is_stable(ratio) {
            Ok(ratio)
        } else {
            Err(MembraneError::invalid(
                "dt",
                format!(
                    "CFL number {ratio:.4} (c={wave_speed}, dt={dt}, h={h}) exceeds the stability limit {}",
                    self.cfl_limit
                ),
            ))
        }
    }

    /// Fail with the step index once `peak` is non-finite or past the limit.
    pub fn guard(&self, step: usize, peak: f64) -> Result<(), MembraneError> {
        if peak.is_finite() && peak <= self.divergence_limit {
            Ok(())
        } else {
            log::warn!("membrane diverged at step {step}: peak {peak:e}");
            Err(MembraneError::NumericalInstability { step, peak })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn courant_number_is_c_dt_over_h() {
        assert!((courant_number(2.0, 0.05, 0.5) - 0.2).abs() < 1e-15);
    }

    #[test]
    fn limit_is_inclusive() {
        let policy = StabilityPolicy::default();
        assert!(policy.is_stable(0.25));
        assert!(!policy.is_stable(0.2500001));
        assert!(!policy.is_stable(f64::NAN));
        assert_eq!(policy.check(1.0, 0.25, 1.0).unwrap(), 0.25);
    }

    #[test]
    fn unstable_ratio_is_an_invalid_parameter() {
        let policy = StabilityPolicy::default();
        match policy.check(1.0, 0.6, 1.0) {
            Err(MembraneError::InvalidParameter { name, reason }) => {
                assert_eq!(name, "dt");
                assert!(reason.contains("0.6000"), "{reason}");
            }
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn guard_trips_on_nan_and_overflow() {
        let policy = StabilityPolicy {
            divergence_limit: 10.0,
            ..Default::default()
        };
        assert!(policy.guard(1, 9.9).is_ok());
        assert!(matches!(
            policy.guard(7, 10.5),
            Err(MembraneError::NumericalInstability { step: 7, .. })
        ));
        assert!(matches!(
            policy.guard(3, f64::INFINITY),
            Err(MembraneError::NumericalInstability { step: 3, .. })
        ));
    }
}
