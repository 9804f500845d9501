//! One partial: an oscillator and its amplitude envelope.

use crate::error::SynthError;

use super::envelope::EnvelopeCurve;
use super::harmonics::{DecayProfile, Partial};
use super::oscillator::{Oscillator, Waveform};
use super::param::{AudioParam, Automatable, FLOOR_EPSILON};

/// A single partial: one oscillator shaped by its own gain envelope.
#[derive(Debug, Clone)]
pub struct PartialVoice {
    partial: Partial,
    harmonic_index: usize,
    oscillator: Oscillator,
    gain: AudioParam,
    envelope: EnvelopeCurve,
    stopped: bool,
}

/// Amplitude envelope for harmonic `harmonic_index` (0 = fundamental):
/// linear attack to `peak`, exponential decays through the profile's
/// fractions, then down to the floor. Higher indices decay sooner.
pub fn partial_envelope(
    peak: f64,
    harmonic_index: usize,
    decay: &DecayProfile,
) -> Result<EnvelopeCurve, SynthError> {
    let mut builder = EnvelopeCurve::starting_at(0.0, 0.0).linear_to(peak, decay.attack_secs);
    for stage in &decay.stages {
        builder = builder.exponential_to(
            peak * stage.fraction,
            decay.scaled_offset(stage.offset_secs, harmonic_index),
        );
    }
    builder
        .exponential_to(
            FLOOR_EPSILON,
            decay.scaled_offset(decay.floor_offset_secs, harmonic_index),
        )
        .build()
}

impl PartialVoice {
    /// Build the voice for `partial`, peaking at `amplitude_ratio × global_scale`.
    pub fn create(
        partial: Partial,
        global_scale: f64,
        harmonic_index: usize,
        decay: &DecayProfile,
    ) -> Result<Self, SynthError> {
        if !(global_scale > 0.0) || !global_scale.is_finite() {
            return Err(SynthError::invalid_argument(format!(
                "global scale must be positive, got {global_scale}"
            )));
        }
        let peak = partial.amplitude_ratio * global_scale;
        let envelope = partial_envelope(peak, harmonic_index, decay)?;
        Ok(Self::with_envelope(partial, harmonic_index, Waveform::Sine, envelope))
    }

    /// A single generator held at `level` for the note's life, with no
    /// per-partial decay.
    pub fn sustained(
        partial: Partial,
        level: f64,
        waveform: Waveform,
    ) -> Result<Self, SynthError> {
        let envelope = EnvelopeCurve::starting_at(level, 0.0).build()?;
        Ok(Self::with_envelope(partial, 0, waveform, envelope))
    }

    fn with_envelope(
        partial: Partial,
        harmonic_index: usize,
        waveform: Waveform,
        envelope: EnvelopeCurve,
    ) -> Self {
        PartialVoice {
            partial,
            harmonic_index,
            oscillator: Oscillator::new(waveform, partial.frequency_hz),
            gain: AudioParam::new(0.0),
            envelope,
            stopped: false,
        }
    }

    pub fn partial(&self) -> &Partial {
        &self.partial
    }

    pub fn harmonic_index(&self) -> usize {
        self.harmonic_index
    }

    pub fn envelope(&self) -> &EnvelopeCurve {
        &self.envelope
    }

    pub fn gain(&self) -> &AudioParam {
        &self.gain
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.oscillator
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Schedule detune and envelope at `at` and begin generation there.
    pub fn start(&mut self, at: f64) -> Result<(), SynthError> {
        if self.stopped {
            return Err(SynthError::invalid_state("partial voice already stopped"));
        }
        self.oscillator.start(at)?;
        self.oscillator
            .detune
            .set_value_at_time(self.partial.detune_cents, at);
        self.envelope.schedule_onto(&mut self.gain, at);
        Ok(())
    }

    /// Halt generation at `at`. The voice cannot be restarted.
    pub fn stop(&mut self, at: f64) -> Result<(), SynthError> {
        if self.stopped {
            return Err(SynthError::invalid_state("partial voice already stopped"));
        }
        self.oscillator.stop(at)?;
        self.stopped = true;
        Ok(())
    }

    pub fn next_sample(&mut self, time: f64, sample_rate: f64) -> f64 {
        let osc = self.oscillator.next_sample(time, sample_rate);
        if osc == 0.0 {
            return 0.0;
        }
        osc * self.gain.value_at(time)
    }

    /// Add this voice's output for `buf.len()` frames starting at `t0`.
    pub fn render_into(&mut self, buf: &mut [f64], t0: f64, sample_rate: f64) {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot += self.next_sample(t0 + i as f64 / sample_rate, sample_rate);
        }
    }
}
