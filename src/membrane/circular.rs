//! Circular membrane on a polar grid.
//!
//! Row `r` of the grid is the ring at radius `r · dr`, column `θ` the spoke at
//! angle `θ · dθ`. The grid splits into three regions with their own rules:
//!
//! * **pole** (ring 0): the single point at the center, stored once per spoke.
//!   Its Laplacian is the removable-singularity limit
//!   `∇²u(0) ≈ 4 · (ū₁ − u₀) / dr²`, with `ū₁` the mean of ring 1.
//! * **interior** (rings `1..nr-1`): centered differences of
//!   `u_rr + u_r / r + u_θθ / r²`, wrapping around in θ.
//! * **rim** (ring `nr - 1`): clamped at zero.
//!
//! All three advance with the same damped leapfrog as the rectangular model,
//! scaled by `(c · dt)²`.

use crate::config::{CircularConfig, PolarPoint};
use crate::error::MembraneError;

use super::grid::{Grid2, TimeLevels};
use super::renderer::AudioRenderer;
use super::{
    Leapfrog, Membrane, require_at_least, require_cell_count, require_finite,
    require_non_negative, require_positive, require_sample_count,
};

/// Relative slack allowed when checking that the grid spans the membrane.
const GEOMETRY_TOLERANCE: f64 = 1e-6;

/// Which update rule a ring follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Pole,
    Interior,
    Rim,
}

impl Region {
    pub fn of(ring: usize, nr: usize) -> Region {
        if ring == 0 {
            Region::Pole
        } else if ring + 1 >= nr {
            Region::Rim
        } else {
            Region::Interior
        }
    }
}

/// Periodic spoke index: spoke `n` is spoke `0`.
#[inline]
pub fn wrap(spoke: isize, n: usize) -> usize {
    spoke.rem_euclid(n as isize) as usize
}

/// `4 · (ū₁ − u₀) / dr²`, the Laplacian at the pole.
#[inline]
pub fn pole_laplacian(pole: f64, ring_mean: f64, dr: f64) -> f64 {
    4.0 * (ring_mean - pole) / (dr * dr)
}

/// Neighbor weights for one interior ring, already multiplied by `(c · dt)²`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RingStencil {
    inward: f64,
    outward: f64,
    angular: f64,
    center: f64,
}

impl RingStencil {
    fn new(ring: usize, dr: f64, dtheta: f64, gain: f64) -> Self {
        debug_assert!(ring > 0, "the pole has no ring stencil");
        let r = ring as f64 * dr;
        let radial = gain / (dr * dr);
        let slope = gain / (2.0 * r * dr);
        let angular = gain / (r * r * dtheta * dtheta);
        RingStencil {
            inward: radial - slope,
            outward: radial + slope,
            angular,
            center: -2.0 * radial - 2.0 * angular,
        }
    }
}

/// Everything the update passes need besides the field itself.
#[derive(Debug, Clone)]
struct PolarStencil {
    /// `(c · dt)²`.
    gain: f64,
    dr: f64,
    /// Entry `k` serves ring `k + 1`.
    rings: Vec<RingStencil>,
    leapfrog: Leapfrog,
}

impl PolarStencil {
    fn update_pole(&self, prev: &Grid2, curr: &Grid2, next: &mut Grid2) {
        let u0 = curr[(0, 0)];
        let ring = curr.row(1);
        let mean = ring.iter().sum::<f64>() / ring.len() as f64;
        let spatial = self.gain * pole_laplacian(u0, mean, self.dr);
        let value = self.leapfrog.advance(u0, spatial, prev[(0, 0)]);
        next.row_mut(0).fill(value);
    }

    fn update_interior(&self, prev: &Grid2, curr: &Grid2, next: &mut Grid2) {
        let nt = curr.cols();
        for (k, s) in self.rings.iter().enumerate() {
            let i = k + 1;
            for j in 0..nt {
                let left = wrap(j as isize - 1, nt);
                let right = wrap(j as isize + 1, nt);
                let u = curr[(i, j)];
                let spatial = s.inward * curr[(i - 1, j)]
                    + s.outward * curr[(i + 1, j)]
                    + s.angular * (curr[(i, left)] + curr[(i, right)])
                    + s.center * u;
                next[(i, j)] = self.leapfrog.advance(u, spatial, prev[(i, j)]);
            }
        }
    }
}

fn pin_rim(grid: &mut Grid2) {
    let rim = grid.rows() - 1;
    grid.row_mut(rim).fill(0.0);
}

#[derive(Debug, Clone)]
pub struct CircularSolver {
    config: CircularConfig,
    levels: TimeLevels,
    stencil: PolarStencil,
    wave_speed: f64,
    courant: f64,
    pickup: PolarPoint,
    steps: usize,
}

impl CircularSolver {
    pub fn new(config: CircularConfig) -> Result<Self, MembraneError> {
        require_positive("radius", config.radius)?;
        require_positive("tension", config.tension)?;
        require_positive("density", config.density)?;
        require_positive("dt", config.dt)?;
        require_positive("dr", config.dr)?;
        require_positive("dtheta", config.dtheta)?;
        require_positive("duration", config.duration)?;
        require_non_negative("damping", config.damping)?;
        require_at_least("nr", config.nr, 3)?;
        require_at_least("ntheta", config.ntheta, 3)?;
        require_cell_count("nr", config.nr, config.ntheta)?;
        require_at_least("sample_rate", config.sample_rate as usize, 1)?;
        require_sample_count(config.sample_rate, config.duration)?;
        require_positive("strike.spread", config.strike.spread)?;
        require_finite("strike.amplitude", config.strike.amplitude)?;
        require_finite("strike_angle", config.strike_angle)?;
        if !(0.0..=1.0).contains(&config.strike_offset) {
            return Err(MembraneError::invalid(
                "strike_offset",
                format!("must lie in [0, 1], got {}", config.strike_offset),
            ));
        }

        let spanned = (config.nr - 1) as f64 * config.dr;
        if (spanned - config.radius).abs() > GEOMETRY_TOLERANCE * config.radius {
            return Err(MembraneError::invalid(
                "dr",
                format!(
                    "(nr - 1) * dr = {spanned} does not reach the rim at radius {}",
                    config.radius
                ),
            ));
        }
        let turn = 2.0 * std::f64::consts::PI;
        let swept = config.ntheta as f64 * config.dtheta;
        if (swept - turn).abs() > GEOMETRY_TOLERANCE * turn {
            return Err(MembraneError::invalid(
                "dtheta",
                format!("ntheta * dtheta = {swept} does not close the circle"),
            ));
        }

        let pickup = config.pickup_point();
        if pickup.ring >= config.nr || pickup.spoke >= config.ntheta {
            return Err(MembraneError::invalid(
                "pickup",
                format!(
                    "(ring {}, spoke {}) is outside the {}x{} polar grid",
                    pickup.ring, pickup.spoke, config.nr, config.ntheta
                ),
            ));
        }

        // The arc between neighboring spokes on ring 1 is the tightest spacing
        // once dθ < 1.
        let wave_speed = config.wave_speed();
        let h = config.dr * config.dtheta.min(1.0);
        let courant = config.stability.check(wave_speed, config.dt, h)?;

        let gain = (wave_speed * config.dt).powi(2);
        let rings = (1..config.nr - 1)
            .map(|i| RingStencil::new(i, config.dr, config.dtheta, gain))
            .collect();
        log::debug!(
            "circular membrane {}x{}: c = {wave_speed:.3} m/s, CFL {courant:.4}, {} samples",
            config.nr,
            config.ntheta,
            config.num_samples()
        );

        Ok(CircularSolver {
            levels: TimeLevels::new(config.nr, config.ntheta),
            stencil: PolarStencil {
                gain,
                dr: config.dr,
                rings,
                leapfrog: Leapfrog::new(config.damping, config.dt),
            },
            wave_speed,
            courant,
            pickup,
            steps: 0,
            config,
        })
    }

    pub fn config(&self) -> &CircularConfig {
        &self.config
    }

    /// `sqrt(tension / density)`.
    pub fn wave_speed(&self) -> f64 {
        self.wave_speed
    }

    pub fn courant(&self) -> f64 {
        self.courant
    }

    pub fn field(&self) -> &Grid2 {
        self.levels.curr()
    }

    /// Seed the configured Gaussian strike, at rest. Distances are measured in
    /// radial steps so `spread` means the same thing at any radius.
    pub fn set_initial_condition(&mut self) {
        let c = &self.config;
        let center = c.strike_offset * c.radius;
        let (x0, y0) = (center * c.strike_angle.cos(), center * c.strike_angle.sin());
        let (amp, alpha, dr) = (c.strike.amplitude, c.strike.spread, c.dr);
        self.seed(|r, theta| {
            let (dx, dy) = (r * theta.cos() - x0, r * theta.sin() - y0);
            amp * (-alpha * (dx * dx + dy * dy) / (dr * dr)).exp()
        });
    }

    /// Seed an arbitrary displacement `f(r, θ)` (meters, radians) at rest.
    /// The pole takes `f(0, 0)`; the rim stays zero.
    pub fn seed(&mut self, mut f: impl FnMut(f64, f64) -> f64) {
        let (nr, nt) = (self.config.nr, self.config.ntheta);
        let (dr, dtheta) = (self.config.dr, self.config.dtheta);
        self.levels.seed(|grid| {
            for i in 0..nr {
                match Region::of(i, nr) {
                    Region::Pole => grid.row_mut(0).fill(f(0.0, 0.0)),
                    Region::Interior => {
                        for j in 0..nt {
                            grid[(i, j)] = f(i as f64 * dr, j as f64 * dtheta);
                        }
                    }
                    Region::Rim => pin_rim(grid),
                }
            }
        });
        self.steps = 0;
    }

    pub fn reset(&mut self) {
        self.levels.clear();
        self.steps = 0;
    }

    pub fn step(&mut self) -> Result<(), MembraneError> {
        let (prev, curr, next) = self.levels.split();
        self.stencil.update_pole(prev, curr, next);
        self.stencil.update_interior(prev, curr, next);
        pin_rim(next);

        self.levels.rotate();
        let index = self.steps;
        self.steps += 1;
        self.config.stability.guard(index, self.levels.curr().peak())
    }

    pub fn simulate(&mut self) -> Result<Vec<f64>, MembraneError> {
        let n = self.config.num_samples();
        AudioRenderer::new(self).render(n)
    }
}

impl Membrane for CircularSolver {
    type Point = PolarPoint;

    fn step(&mut self) -> Result<(), MembraneError> {
        CircularSolver::step(self)
    }

    fn read(&self, point: PolarPoint) -> f64 {
        self.levels.curr()[(point.ring, point.spoke)]
    }

    fn contains(&self, point: PolarPoint) -> bool {
        point.ring < self.config.nr && point.spoke < self.config.ntheta
    }

    fn pickup_point(&self) -> PolarPoint {
        self.pickup
    }

    fn num_samples(&self) -> usize {
        self.config.num_samples()
    }

    fn steps_taken(&self) -> usize {
        self.steps
    }
}
