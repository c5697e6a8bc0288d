//! Audio renderer — steps a membrane and records its pickups, one sample per step.

use std::ops::ControlFlow;

use crate::error::MembraneError;

use super::Membrane;

/// Drives a [`Membrane`] and samples one or more taps after every step.
///
/// The first tap is the mono output; extra taps (stereo or multi-mic setups)
/// are read from the same field at the same instant.
pub struct AudioRenderer<'a, M: Membrane> {
    membrane: &'a mut M,
    taps: Vec<M::Point>,
}

impl<'a, M: Membrane> AudioRenderer<'a, M> {
    /// Render from the membrane's configured pickup.
    pub fn new(membrane: &'a mut M) -> Self {
        let pickup = membrane.pickup_point();
        AudioRenderer {
            membrane,
            taps: vec![pickup],
        }
    }

    /// Render from several taps at once. Every tap must lie on the grid.
    pub fn with_taps(membrane: &'a mut M, taps: Vec<M::Point>) -> Result<Self, MembraneError> {
        if taps.is_empty() {
            return Err(MembraneError::invalid("taps", "at least one tap is required"));
        }
        if let Some(bad) = taps.iter().find(|&&p| !membrane.contains(p)) {
            return Err(MembraneError::invalid(
                "taps",
                format!("{bad:?} is outside the grid"),
            ));
        }
        Ok(AudioRenderer { membrane, taps })
    }

    pub fn taps(&self) -> &[M::Point] {
        &self.taps
    }

    /// Run `num_samples` steps and return the first tap's signal.
    pub fn render(&mut self, num_samples: usize) -> Result<Vec<f64>, MembraneError> {
        let tap = self.taps[0];
        let mut out = Vec::with_capacity(num_samples);
        for _ in 0..num_samples {
            self.membrane.step()?;
            out.push(self.membrane.read(tap));
        }
        log::info!("rendered {num_samples} samples");
        Ok(out)
    }

    /// Run `num_samples` steps and return one channel per tap.
    pub fn render_taps(&mut self, num_samples: usize) -> Result<Vec<Vec<f64>>, MembraneError> {
        let mut channels: Vec<Vec<f64>> = self
            .taps
            .iter()
            .map(|_| Vec::with_capacity(num_samples))
            .collect();
        for _ in 0..num_samples {
            self.membrane.step()?;
            for (channel, &tap) in channels.iter_mut().zip(&self.taps) {
                channel.push(self.membrane.read(tap));
            }
        }
        log::info!("rendered {num_samples} samples on {} taps", self.taps.len());
        Ok(channels)
    }

    /// Render up to `num_samples` of the first tap, handing them to `sink` in
    /// blocks of `block_size`. Returning `ControlFlow::Break` from the sink
    /// stops the run before the next step. Returns the number of samples
    /// produced.
    pub fn stream(
        &mut self,
        num_samples: usize,
        block_size: usize,
        mut sink: impl FnMut(&[f64]) -> ControlFlow<()>,
    ) -> Result<usize, MembraneError> {
        let tap = self.taps[0];
        let block_size = block_size.max(1);
        let mut block = Vec::with_capacity(block_size);
        let mut produced = 0;

        while produced < num_samples {
            block.clear();
            let len = block_size.min(num_samples - produced);
            for _ in 0..len {
                self.membrane.step()?;
                block.push(self.membrane.read(tap));
            }
            produced += len;
            if sink(&block).is_break() {
                log::warn!("render cancelled after {produced} of {num_samples} samples");
                break;
            }
        }
        Ok(produced)
    }
}
