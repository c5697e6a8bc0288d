pub mod config;
pub mod error;
pub mod membrane;
pub mod wav;

use crate::config::{MembraneConfig, SynthConfig};
use crate::error::MembraneError;
use crate::membrane::Membrane;
use crate::membrane::circular::CircularSolver;
use crate::membrane::rectangular::RectangularSolver;
use crate::membrane::renderer::AudioRenderer;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the drumhead version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Build the configured membrane, strike it, and return the raw pickup signal.
pub fn render_samples(config: &MembraneConfig) -> Result<Vec<f64>, MembraneError> {
    match config {
        MembraneConfig::Rectangular(c) => {
            let mut solver = RectangularSolver::new(c.clone())?;
            solver.set_initial_condition();
            solver.simulate()
        }
        MembraneConfig::Circular(c) => {
            let mut solver = CircularSolver::new(c.clone())?;
            solver.set_initial_condition();
            solver.simulate()
        }
    }
}

/// Render every output channel: the pickup alone, or one channel per
/// configured tap.
pub fn render_channels(config: &MembraneConfig) -> Result<Vec<Vec<f64>>, MembraneError> {
    match config {
        MembraneConfig::Rectangular(c) => {
            let mut solver = RectangularSolver::new(c.clone())?;
            solver.set_initial_condition();
            render_outputs(&mut solver, c.taps.clone())
        }
        MembraneConfig::Circular(c) => {
            let mut solver = CircularSolver::new(c.clone())?;
            solver.set_initial_condition();
            render_outputs(&mut solver, c.taps.clone())
        }
    }
}

fn render_outputs<M: Membrane>(
    membrane: &mut M,
    taps: Vec<M::Point>,
) -> Result<Vec<Vec<f64>>, MembraneError> {
    let n = membrane.num_samples();
    if taps.is_empty() {
        return Ok(vec![AudioRenderer::new(membrane).render(n)?]);
    }
    AudioRenderer::with_taps(membrane, taps)?.render_taps(n)
}

/// Render a membrane to a 16-bit WAV file as bytes: mono from the pickup, or
/// one interleaved channel per tap. Normalization uses a single gain across
/// all channels.
pub fn render_wav(config: &SynthConfig) -> Result<Vec<u8>, MembraneError> {
    let output = &config.output;
    if output.normalize && !(output.peak > 0.0 && output.peak <= 1.0) {
        return Err(MembraneError::invalid(
            "output.peak",
            format!("must lie in (0, 1], got {}", output.peak),
        ));
    }

    let channels = render_channels(&config.membrane)?;
    let channel_count = u16::try_from(channels.len())
        .ok()
        .filter(|&n| n <= wav::MAX_CHANNELS)
        .ok_or_else(|| {
            MembraneError::invalid(
                "taps",
                format!("{} channels do not fit a WAV file", channels.len()),
            )
        })?;
    let mut samples = wav::interleave(&channels);
    if samples.len() > wav::MAX_PCM_SAMPLES {
        return Err(MembraneError::invalid(
            "taps",
            format!("{} samples do not fit in one WAV data chunk", samples.len()),
        ));
    }
    if output.normalize {
        samples = wav::normalize(&samples, output.peak);
    }
    let pcm = wav::to_pcm_i16(&samples);
    Ok(wav::encode_wav(&pcm, config.membrane.sample_rate(), channel_count))
}

/// WASM-exposed: render a membrane described by a JS config object to WAV bytes.
#[wasm_bindgen]
pub fn render_membrane_wav(config: JsValue) -> Result<Vec<u8>, JsValue> {
    let config: SynthConfig =
        serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    render_wav(&config).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render a membrane to mono f32 samples (raw displacement).
#[wasm_bindgen]
pub fn render_membrane_samples(config: JsValue) -> Result<Vec<f32>, JsValue> {
    let config: MembraneConfig =
        serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let samples = render_samples(&config).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(samples.iter().map(|&s| s as f32).collect())
}
