//! Configuration types for membrane synthesis.
//!
//! Every struct deserializes with `#[serde(default)]`, so a config file only
//! needs to name the values it changes. A full render is described by a
//! [`SynthConfig`]:
//!
//! ```json
//! {
//!   "membrane": { "shape": "circular", "radius": 0.2, "damping": 4.0 },
//!   "output": { "peak": 0.8 }
//! }
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::MembraneError;
use crate::membrane::stability::StabilityPolicy;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

// ── Top level ───────────────────────────────────────────────

/// A complete render request: which membrane to simulate and how to
/// prepare its output for PCM encoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    pub membrane: MembraneConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SynthConfig {
    pub fn from_json(source: &str) -> Result<Self, MembraneError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn to_json(&self) -> Result<String, MembraneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Membrane geometry and its physical parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum MembraneConfig {
    Rectangular(RectangularConfig),
    Circular(CircularConfig),
}

impl Default for MembraneConfig {
    fn default() -> Self {
        MembraneConfig::Rectangular(RectangularConfig::default())
    }
}

impl MembraneConfig {
    pub fn sample_rate(&self) -> u32 {
        match self {
            MembraneConfig::Rectangular(c) => c.sample_rate,
            MembraneConfig::Circular(c) => c.sample_rate,
        }
    }

    pub fn num_samples(&self) -> usize {
        match self {
            MembraneConfig::Rectangular(c) => c.num_samples(),
            MembraneConfig::Circular(c) => c.num_samples(),
        }
    }

    /// Override the simulated duration in seconds.
    pub fn set_duration(&mut self, seconds: f64) {
        match self {
            MembraneConfig::Rectangular(c) => c.duration = seconds,
            MembraneConfig::Circular(c) => c.duration = seconds,
        }
    }
}

/// How raw displacement is prepared for fixed-point output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Scale the rendered signal so its absolute peak equals `peak`.
    pub normalize: bool,
    /// Target peak in [0, 1] (full scale = 1.0).
    pub peak: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            normalize: true,
            peak: 0.89, // about -1 dBFS
        }
    }
}

// ── Excitation & pickups ────────────────────────────────────

/// Gaussian strike: `amplitude · exp(-spread · d²)`, with `d` in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrikeConfig {
    pub amplitude: f64,
    pub spread: f64,
}

impl Default for StrikeConfig {
    fn default() -> Self {
        StrikeConfig {
            amplitude: 0.1,
            spread: 0.01,
        }
    }
}

/// A cell on the Cartesian grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: usize,
    pub y: usize,
}

/// A cell on the polar grid: `ring` is the radial index, `spoke` the angular one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolarPoint {
    pub ring: usize,
    pub spoke: usize,
}

// ── Rectangular ─────────────────────────────────────────────

/// Rectangular membrane on a unit-spaced Cartesian grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectangularConfig {
    pub nx: usize,
    pub ny: usize,
    /// Energy loss coefficient (1/s). Zero means lossless.
    pub damping: f64,
    /// Wave speed in grid cells per second.
    pub wave_speed: f64,
    /// Time step in seconds.
    pub dt: f64,
    /// Simulated duration in seconds.
    pub duration: f64,
    pub sample_rate: u32,
    pub strike: StrikeConfig,
    /// Pickup cell; the grid center when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup: Option<GridPoint>,
    /// Multi-channel output: one WAV channel per tap, replacing `pickup`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taps: Vec<GridPoint>,
    pub stability: StabilityPolicy,
}

impl Default for RectangularConfig {
    fn default() -> Self {
        let sample_rate = DEFAULT_SAMPLE_RATE;
        RectangularConfig {
            nx: 128,
            ny: 128,
            damping: 10.0,
            // A fifth of a cell per sample: CFL 0.2 at the default rate.
            wave_speed: 0.2 * sample_rate as f64,
            dt: 1.0 / sample_rate as f64,
            duration: 2.0,
            sample_rate,
            strike: StrikeConfig::default(),
            pickup: None,
            taps: Vec::new(),
            stability: StabilityPolicy::default(),
        }
    }
}

impl RectangularConfig {
    /// `round(sample_rate · duration)`.
    pub fn num_samples(&self) -> usize {
        samples_for(self.sample_rate, self.duration)
    }

    pub fn pickup_point(&self) -> GridPoint {
        self.pickup.unwrap_or(GridPoint {
            x: self.nx / 2,
            y: self.ny / 2,
        })
    }
}

// ── Circular ────────────────────────────────────────────────

/// Circular membrane on a polar grid. Ring `nr - 1` sits on the rim, so
/// `(nr - 1) · dr` must equal `radius` and `ntheta · dtheta` must cover 2π.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircularConfig {
    /// Meters.
    pub radius: f64,
    /// N/m.
    pub tension: f64,
    /// Areal mass density, kg/m².
    pub density: f64,
    pub damping: f64,
    pub dt: f64,
    /// Radial step, meters.
    pub dr: f64,
    /// Angular step, radians.
    pub dtheta: f64,
    pub nr: usize,
    pub ntheta: usize,
    pub duration: f64,
    pub sample_rate: u32,
    pub strike: StrikeConfig,
    /// Strike position as a fraction of the radius (0 = center).
    pub strike_offset: f64,
    /// Strike angle in radians.
    pub strike_angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup: Option<PolarPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taps: Vec<PolarPoint>,
    pub stability: StabilityPolicy,
}

impl Default for CircularConfig {
    fn default() -> Self {
        let sample_rate = DEFAULT_SAMPLE_RATE;
        let radius = 0.1;
        let (nr, ntheta) = (21, 16);
        CircularConfig {
            radius,
            tension: 100.0,
            density: 0.25,
            damping: 2.0,
            dt: 1.0 / sample_rate as f64,
            dr: radius / (nr - 1) as f64,
            dtheta: 2.0 * PI / ntheta as f64,
            nr,
            ntheta,
            duration: 2.0,
            sample_rate,
            strike: StrikeConfig {
                amplitude: 0.1,
                spread: 0.05,
            },
            strike_offset: 0.0,
            strike_angle: 0.0,
            pickup: None,
            taps: Vec::new(),
            stability: StabilityPolicy::default(),
        }
    }
}

impl CircularConfig {
    /// Wave speed `sqrt(tension / density)` in m/s.
    pub fn wave_speed(&self) -> f64 {
        (self.tension / self.density).sqrt()
    }

    /// Resize the polar grid, deriving `dr` and `dtheta` from the radius.
    pub fn with_resolution(mut self, nr: usize, ntheta: usize) -> Self {
        self.nr = nr;
        self.ntheta = ntheta;
        self.dr = self.radius / nr.saturating_sub(1).max(1) as f64;
        self.dtheta = 2.0 * PI / ntheta.max(1) as f64;
        self
    }

    pub fn num_samples(&self) -> usize {
        samples_for(self.sample_rate, self.duration)
    }

    pub fn pickup_point(&self) -> PolarPoint {
        self.pickup.unwrap_or(PolarPoint {
            ring: self.nr / 2,
            spoke: 0,
        })
    }
}

fn samples_for(sample_rate: u32, duration: f64) -> usize {
    (sample_rate as f64 * duration).round() as usize
}
