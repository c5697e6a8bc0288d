//! Membrane solvers — explicit FDTD integration of the 2D wave equation.
//!
//! Both geometries share the same damped leapfrog in time and the same
//! [`Membrane`] interface, which is what the [`renderer`] drives. Only the
//! spatial Laplacian and the boundary handling differ between them.

pub mod circular;
pub mod grid;
pub mod rectangular;
pub mod renderer;
pub mod stability;

use std::fmt::Debug;

use crate::error::MembraneError;

/// A membrane that can be advanced one time step and listened to.
pub trait Membrane {
    /// A cell address on this membrane's grid.
    type Point: Copy + Debug;

    /// Advance the field by one time step.
    fn step(&mut self) -> Result<(), MembraneError>;

    /// Displacement at `point` at the current time.
    fn read(&self, point: Self::Point) -> f64;

    fn contains(&self, point: Self::Point) -> bool;

    /// The configured pickup location.
    fn pickup_point(&self) -> Self::Point;

    fn pickup(&self) -> f64 {
        self.read(self.pickup_point())
    }

    /// Number of samples the configured duration asks for.
    fn num_samples(&self) -> usize;

    fn steps_taken(&self) -> usize;
}

/// Damped leapfrog in time:
/// `next = k · (2u + spatial) − k · (1 − γ) · prev`, with `γ = damping · dt / 2`
/// and `k = 1 / (1 + γ)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leapfrog {
    k: f64,
    decay: f64,
}

impl Leapfrog {
    pub fn new(damping: f64, dt: f64) -> Self {
        let gamma = damping * dt / 2.0;
        let k = 1.0 / (1.0 + gamma);
        Leapfrog {
            k,
            decay: k * (1.0 - gamma),
        }
    }

    /// `spatial` is the already-scaled Laplacian term for the cell.
    #[inline]
    pub fn advance(&self, curr: f64, spatial: f64, prev: f64) -> f64 {
        self.k * (spatial + 2.0 * curr) - self.decay * prev
    }
}

/// Longest render a single solver will produce: about 100 minutes at 44.1 kHz.
pub const MAX_SAMPLES: usize = 1 << 28;

/// Largest grid a solver will allocate (8192 × 8192 cells per time slice).
pub const MAX_CELLS: usize = 1 << 26;

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<(), MembraneError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MembraneError::invalid(
            name,
            format!("must be positive and finite, got {value}"),
        ))
    }
}

pub(crate) fn require_non_negative(name: &'static str, value: f64) -> Result<(), MembraneError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MembraneError::invalid(
            name,
            format!("must be non-negative and finite, got {value}"),
        ))
    }
}

pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<(), MembraneError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(MembraneError::invalid(name, format!("must be finite, got {value}")))
    }
}

/// `round(sample_rate · duration)` must stay within [`MAX_SAMPLES`].
pub(crate) fn require_sample_count(sample_rate: u32, duration: f64) -> Result<(), MembraneError> {
    let samples = (sample_rate as f64 * duration).round();
    if samples <= MAX_SAMPLES as f64 {
        Ok(())
    } else {
        Err(MembraneError::invalid(
            "duration",
            format!("{duration} s at {sample_rate} Hz needs {samples:e} samples, limit is {MAX_SAMPLES}"),
        ))
    }
}

/// `rows · cols` must not overflow and must stay within [`MAX_CELLS`].
pub(crate) fn require_cell_count(
    name: &'static str,
    rows: usize,
    cols: usize,
) -> Result<(), MembraneError> {
    match rows.checked_mul(cols) {
        Some(cells) if cells <= MAX_CELLS => Ok(()),
        _ => Err(MembraneError::invalid(
            name,
            format!("a {rows}x{cols} grid exceeds the {MAX_CELLS} cell limit"),
        )),
    }
}

pub(crate) fn require_at_least(
    name: &'static str,
    value: usize,
    min: usize,
) -> Result<(), MembraneError> {
    if value >= min {
        Ok(())
    } else {
        Err(MembraneError::invalid(
            name,
            format!("must be at least {min}, got {value}"),
        ))
    }
}
