//! Rectangular membrane on a Cartesian grid with clamped (Dirichlet) edges.
//!
//! The grid spacing is one cell in both directions, so the CFL number is
//! `wave_speed · dt` and it doubles as the gain on the 5-point Laplacian:
//!
//! ```text
//! next[i][j] = K·(λ·(E + W + N + S − 4·C) + 2·C) − K·(1 − γ)·prev[i][j]
//! ```

use crate::config::{GridPoint, RectangularConfig};
use crate::error::MembraneError;

use super::grid::{Grid2, TimeLevels};
use super::renderer::AudioRenderer;
use super::{
    Leapfrog, Membrane, require_at_least, require_cell_count, require_finite,
    require_non_negative, require_positive, require_sample_count,
};

/// Smallest grid edge that still has an interior row/column.
pub const MIN_EDGE: usize = 3;

#[derive(Debug, Clone)]
pub struct RectangularSolver {
    config: RectangularConfig,
    levels: TimeLevels,
    /// CFL number, used as the stencil gain.
    courant: f64,
    leapfrog: Leapfrog,
    pickup: GridPoint,
    steps: usize,
}

impl RectangularSolver {
    pub fn new(config: RectangularConfig) -> Result<Self, MembraneError> {
        require_at_least("nx", config.nx, MIN_EDGE)?;
        require_at_least("ny", config.ny, MIN_EDGE)?;
        require_cell_count("nx", config.nx, config.ny)?;
        require_positive("wave_speed", config.wave_speed)?;
        require_positive("dt", config.dt)?;
        require_positive("duration", config.duration)?;
        require_at_least("sample_rate", config.sample_rate as usize, 1)?;
        require_sample_count(config.sample_rate, config.duration)?;
        require_non_negative("damping", config.damping)?;
        require_positive("strike.spread", config.strike.spread)?;
        require_finite("strike.amplitude", config.strike.amplitude)?;

        let pickup = config.pickup_point();
        if pickup.x >= config.nx || pickup.y >= config.ny {
            return Err(MembraneError::invalid(
                "pickup",
                format!(
                    "({}, {}) is outside the {}x{} grid",
                    pickup.x, pickup.y, config.nx, config.ny
                ),
            ));
        }

        let courant = config.stability.check(config.wave_speed, config.dt, 1.0)?;
        log::debug!(
            "rectangular membrane {}x{}: CFL {courant:.4}, {} samples",
            config.nx,
            config.ny,
            config.num_samples()
        );

        Ok(RectangularSolver {
            levels: TimeLevels::new(config.nx, config.ny),
            leapfrog: Leapfrog::new(config.damping, config.dt),
            courant,
            pickup,
            steps: 0,
            config,
        })
    }

    pub fn config(&self) -> &RectangularConfig {
        &self.config
    }

    pub fn courant(&self) -> f64 {
        self.courant
    }

    /// The displacement field at the current time.
    pub fn field(&self) -> &Grid2 {
        self.levels.curr()
    }

    /// Seed the configured Gaussian strike at the grid center, at rest.
    pub fn set_initial_condition(&mut self) {
        let (cx, cy) = ((self.config.nx / 2) as f64, (self.config.ny / 2) as f64);
        let amp = self.config.strike.amplitude;
        let alpha = self.config.strike.spread;
        self.seed(|i, j| {
            let (dx, dy) = (i as f64 - cx, j as f64 - cy);
            amp * (-alpha * (dx * dx + dy * dy)).exp()
        });
    }

    /// Seed an arbitrary displacement `f(i, j)` at rest. Edge cells stay zero.
    pub fn seed(&mut self, mut f: impl FnMut(usize, usize) -> f64) {
        let (nx, ny) = (self.config.nx, self.config.ny);
        self.levels.seed(|grid| {
            for i in 1..nx - 1 {
                for j in 1..ny - 1 {
                    grid[(i, j)] = f(i, j);
                }
            }
            pin_edges(grid);
        });
        self.steps = 0;
    }

    /// Return the membrane to rest.
    pub fn reset(&mut self) {
        self.levels.clear();
        self.steps = 0;
    }

    pub fn step(&mut self) -> Result<(), MembraneError> {
        let (nx, ny) = (self.config.nx, self.config.ny);
        let (prev, curr, next) = self.levels.split();

        for i in 1..nx - 1 {
            for j in 1..ny - 1 {
                let c = curr[(i, j)];
                let laplacian = curr[(i + 1, j)] + curr[(i - 1, j)] + curr[(i, j + 1)]
                    + curr[(i, j - 1)]
                    - 4.0 * c;
                next[(i, j)] = self.leapfrog.advance(c, self.courant * laplacian, prev[(i, j)]);
            }
        }
        pin_edges(next);

        self.levels.rotate();
        let index = self.steps;
        self.steps += 1;
        self.config.stability.guard(index, self.levels.curr().peak())
    }

    /// Run the configured number of steps, returning one pickup sample per step.
    pub fn simulate(&mut self) -> Result<Vec<f64>, MembraneError> {
        let n = self.config.num_samples();
        AudioRenderer::new(self).render(n)
    }
}

/// Dirichlet edges: first/last row and column are held at zero.
fn pin_edges(grid: &mut Grid2) {
    let (rows, cols) = (grid.rows(), grid.cols());
    grid.row_mut(0).fill(0.0);
    grid.row_mut(rows - 1).fill(0.0);
    for i in 1..rows - 1 {
        grid[(i, 0)] = 0.0;
        grid[(i, cols - 1)] = 0.0;
    }
}

impl Membrane for RectangularSolver {
    type Point = GridPoint;

    fn step(&mut self) -> Result<(), MembraneError> {
        RectangularSolver::step(self)
    }

    fn read(&self, point: GridPoint) -> f64 {
        self.levels.curr()[(point.x, point.y)]
    }

    fn contains(&self, point: GridPoint) -> bool {
        point.x < self.config.nx && point.y < self.config.ny
    }

    fn pickup_point(&self) -> GridPoint {
        self.pickup
    }

    fn num_samples(&self) -> usize {
        self.config.num_samples()
    }

    fn steps_taken(&self) -> usize {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrikeConfig;
    use crate::membrane::stability::StabilityPolicy;

    /// Unit wave speed and dt = 0.25: CFL exactly 0.25.
    fn small_config(n: usize) -> RectangularConfig {
        RectangularConfig {
            nx: n,
            ny: n,
            damping: 0.0,
            wave_speed: 1.0,
            dt: 0.25,
            duration: 1.0,
            sample_rate: 100,
            ..Default::default()
        }
    }

    fn expect_invalid(config: RectangularConfig, param: &str) {
        match RectangularSolver::new(config) {
            Err(MembraneError::InvalidParameter { name, .. }) => assert_eq!(name, param),
            other => panic!("expected InvalidParameter({param}), got {other:?}"),
        }
    }

    #[test]
    fn default_config_is_valid() {
        let solver = RectangularSolver::new(RectangularConfig::default()).unwrap();
        assert!((solver.courant() - 0.2).abs() < 1e-12);
        assert_eq!(solver.num_samples(), 88200);
    }

    #[test]
    fn rejects_grid_without_interior() {
        expect_invalid(RectangularConfig { nx: 2, ..small_config(8) }, "nx");
        expect_invalid(RectangularConfig { ny: 1, ..small_config(8) }, "ny");
    }

    #[test]
    fn rejects_non_positive_parameters() {
        expect_invalid(RectangularConfig { dt: 0.0, ..small_config(8) }, "dt");
        expect_invalid(RectangularConfig { wave_speed: -1.0, ..small_config(8) }, "wave_speed");
        expect_invalid(RectangularConfig { duration: 0.0, ..small_config(8) }, "duration");
        expect_invalid(RectangularConfig { damping: -0.5, ..small_config(8) }, "damping");
        expect_invalid(RectangularConfig { sample_rate: 0, ..small_config(8) }, "sample_rate");
    }

    #[test]
    fn rejects_oversized_renders() {
        expect_invalid(RectangularConfig { duration: 1e300, ..small_config(4) }, "duration");
        expect_invalid(
            RectangularConfig { nx: usize::MAX / 2, ny: 4, ..small_config(4) },
            "nx",
        );
        expect_invalid(RectangularConfig { nx: 1 << 14, ny: 1 << 14, ..small_config(4) }, "nx");
    }

    #[test]
    fn rejects_cfl_above_limit() {
        // 1.0 * 0.3 / 1 = 0.3 > 0.25
        expect_invalid(RectangularConfig { dt: 0.3, ..small_config(8) }, "dt");
    }

    #[test]
    fn rejects_pickup_outside_grid() {
        let config = RectangularConfig {
            pickup: Some(GridPoint { x: 8, y: 0 }),
            ..small_config(8)
        };
        expect_invalid(config, "pickup");
    }

    #[test]
    fn zero_input_gives_zero_output() {
        let mut solver = RectangularSolver::new(small_config(12)).unwrap();
        let out = solver.simulate().unwrap();
        assert_eq!(out.len(), 100);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn output_length_is_rounded_duration() {
        let config = RectangularConfig {
            sample_rate: 8000,
            duration: 0.0123,
            ..small_config(9)
        };
        let mut solver = RectangularSolver::new(config).unwrap();
        solver.set_initial_condition();
        assert_eq!(solver.simulate().unwrap().len(), 98);
    }

    #[test]
    fn identical_configs_render_identically() {
        let run = || {
            let mut solver = RectangularSolver::new(small_config(20)).unwrap();
            solver.set_initial_condition();
            solver.simulate().unwrap()
        };
        let (a, b) = (run(), run());
        assert_eq!(a, b);
        assert!(a.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn initial_condition_is_at_rest_with_clamped_edges() {
        let mut solver = RectangularSolver::new(small_config(10)).unwrap();
        solver.set_initial_condition();
        let field = solver.field();
        assert!((field[(5, 5)] - 0.1).abs() < 1e-15);
        for k in 0..10 {
            assert_eq!(field[(0, k)], 0.0);
            assert_eq!(field[(9, k)], 0.0);
            assert_eq!(field[(k, 0)], 0.0);
            assert_eq!(field[(k, 9)], 0.0);
        }
        assert_eq!(solver.levels.prev(), solver.levels.curr());
    }

    #[test]
    fn edges_stay_pinned_while_stepping() {
        let mut solver = RectangularSolver::new(small_config(10)).unwrap();
        solver.seed(|_, _| 1.0);
        for _ in 0..25 {
            solver.step().unwrap();
        }
        let field = solver.field();
        for k in 0..10 {
            assert_eq!(field[(0, k)], 0.0);
            assert_eq!(field[(9, k)], 0.0);
            assert_eq!(field[(k, 0)], 0.0);
            assert_eq!(field[(k, 9)], 0.0);
        }
    }

    #[test]
    fn single_step_matches_closed_form_stencil() {
        let config = RectangularConfig {
            strike: StrikeConfig {
                amplitude: 1.0,
                spread: 0.1,
            },
            ..small_config(16)
        };
        let mut solver = RectangularSolver::new(config).unwrap();
        solver.set_initial_condition();

        let u = |i: f64, j: f64| (-0.1 * ((i - 8.0).powi(2) + (j - 8.0).powi(2))).exp();
        let c = u(8.0, 8.0);
        let laplacian = u(9.0, 8.0) + u(7.0, 8.0) + u(8.0, 9.0) + u(8.0, 7.0) - 4.0 * c;
        // K = 1 and γ = 0 without damping; prev equals curr.
        let expected = 0.25 * laplacian + 2.0 * c - c;

        solver.step().unwrap();
        let sample = solver.pickup();
        assert!((sample - expected).abs() < 1e-12, "{sample} vs {expected}");
        // With these numbers the update collapses to e^-0.1.
        assert!((sample - (-0.1_f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn mirrored_strikes_give_identical_center_traces() {
        let trace = |x0: f64| {
            let mut solver = RectangularSolver::new(small_config(17)).unwrap();
            solver.seed(|i, j| {
                let (dx, dy) = (i as f64 - x0, j as f64 - 8.0);
                (-0.05 * (dx * dx + dy * dy)).exp()
            });
            AudioRenderer::new(&mut solver).render(200).unwrap()
        };
        let left = trace(5.0);
        let right = trace(11.0);
        for (n, (a, b)) in left.iter().zip(&right).enumerate() {
            assert!((a - b).abs() < 1e-12, "step {n}: {a} vs {b}");
        }
    }

    #[test]
    fn centered_strike_keeps_field_mirror_symmetric() {
        let mut solver = RectangularSolver::new(small_config(17)).unwrap();
        solver.set_initial_condition();
        for _ in 0..50 {
            solver.step().unwrap();
        }
        let field = solver.field();
        for i in 0..17 {
            for j in 0..17 {
                assert!((field[(i, j)] - field[(16 - i, j)]).abs() < 1e-12);
                assert!((field[(i, j)] - field[(i, 16 - j)]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn damped_field_stays_bounded_and_decays() {
        let config = RectangularConfig {
            damping: 0.01,
            sample_rate: 1000,
            duration: 10.0,
            ..small_config(16)
        };
        let mut solver = RectangularSolver::new(config).unwrap();
        solver.set_initial_condition();
        let initial_peak = solver.field().peak();

        let mut peaks = Vec::with_capacity(10_000);
        for _ in 0..10_000 {
            solver.step().unwrap();
            peaks.push(solver.field().peak());
        }
        assert!(peaks.iter().all(|p| p.is_finite()));
        let early = peaks[..1000].iter().cloned().fold(initial_peak, f64::max);
        let late = peaks[9000..].iter().cloned().fold(0.0, f64::max);
        assert!(late < 0.5 * early, "late peak {late} should be well below early peak {early}");
    }

    #[test]
    fn unstable_ratio_is_caught_by_the_divergence_guard() {
        let config = RectangularConfig {
            // CFL 2.0, eight times the default limit.
            wave_speed: 8.0,
            strike: StrikeConfig {
                amplitude: 1.0,
                spread: 0.1,
            },
            stability: StabilityPolicy {
                cfl_limit: 10.0,
                ..Default::default()
            },
            ..small_config(16)
        };
        let mut solver = RectangularSolver::new(config).unwrap();
        solver.set_initial_condition();
        match solver.simulate() {
            Err(MembraneError::NumericalInstability { step, .. }) => assert!(step < 100),
            other => panic!("expected NumericalInstability, got {other:?}"),
        }
    }

    #[test]
    fn reset_returns_to_rest() {
        let mut solver = RectangularSolver::new(small_config(10)).unwrap();
        solver.set_initial_condition();
        solver.step().unwrap();
        solver.reset();
        assert_eq!(solver.steps_taken(), 0);
        assert_eq!(solver.field().peak(), 0.0);
    }
}
