//! Mixer — sums voice outputs block by block.

/// A summing bus that accumulates one block of audio from several sources.
#[derive(Debug, Clone, Default)]
pub struct Mixer {
    buffer: Vec<f64>,
}

impl Mixer {
    pub fn new() -> Self {
        Mixer { buffer: Vec::new() }
    }

    /// Prepare a block of `num_samples` zeros.
    pub fn clear(&mut self, num_samples: usize) {
        self.buffer.clear();
        self.buffer.resize(num_samples, 0.0);
    }

    /// The block, for sources that accumulate in place.
    pub fn samples_mut(&mut self) -> &mut [f64] {
        &mut self.buffer
    }

    /// The summed block.
    pub fn samples(&self) -> &[f64] {
        &self.buffer
    }
}

/// Convert a graph sample to the destination's range, clipping at ±1.
pub fn to_destination(sample: f64) -> f32 {
    sample.clamp(-1.0, 1.0) as f32
}
