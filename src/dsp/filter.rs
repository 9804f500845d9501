//! Biquad filters and the piano filter chain.
//!
//! Coefficients follow the Audio EQ Cookbook with WebAudio's
//! BiquadFilterNode conventions: low/high-pass Q is given in decibels.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::SynthError;

use super::envelope::{EnvelopeCurve, EnvelopeSegment};
use super::param::AudioParam;

/// Lowest cutoff the filters will compute coefficients for.
const MIN_CUTOFF_HZ: f64 = 10.0;

/// Filter type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    Lowpass,
    Highpass,
}

/// A biquad IIR filter (2nd order), Direct Form II Transposed.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    pub filter_type: FilterType,
    pub frequency: AudioParam,
    /// Resonance in dB.
    pub q: AudioParam,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
    /// (cutoff, q) the coefficients were computed for.
    computed_for: Option<(f64, f64)>,
}

impl BiquadFilter {
    pub fn new(filter_type: FilterType, frequency_hz: f64, q_db: f64, sample_rate: f64) -> Self {
        BiquadFilter {
            filter_type,
            frequency: AudioParam::new(frequency_hz),
            q: AudioParam::new(q_db),
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
            computed_for: None,
        }
    }

    /// Cutoff actually used at `time`, kept below Nyquist.
    pub fn cutoff_at(&self, time: f64) -> f64 {
        let nyquist = self.sample_rate * 0.49;
        self.frequency.value_at(time).clamp(MIN_CUTOFF_HZ, nyquist)
    }

    fn update_coefficients(&mut self, cutoff: f64, q_db: f64) {
        let w0 = 2.0 * PI * cutoff / self.sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * 10.0_f64.powf(q_db / 20.0));

        let (b0, b1, b2) = match self.filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterType::Highpass => {
                let b1 = -(1.0 + cos_w0);
                (-b1 / 2.0, b1, -b1 / 2.0)
            }
        };
        let a0 = 1.0 + alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
        self.computed_for = Some((cutoff, q_db));
    }

    /// Process one sample at `time`, following any scheduled automation.
    pub fn process(&mut self, input: f64, time: f64) -> f64 {
        let cutoff = self.cutoff_at(time);
        let q_db = self.q.value_at(time);
        if self.computed_for != Some((cutoff, q_db)) {
            self.update_coefficients(cutoff, q_db);
        }

        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    /// Clear filter memory.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Settings for the high-pass → low-pass chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSettings {
    pub highpass_hz: f64,
    pub highpass_q: f64,
    pub lowpass_q: f64,
    /// Low-pass cutoff over the note's life; the first point is the initial cutoff.
    pub lowpass_cutoff: Vec<EnvelopeSegment>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        FilterSettings {
            highpass_hz: 80.0,
            highpass_q: 0.5,
            lowpass_q: 1.0,
            lowpass_cutoff: vec![
                EnvelopeSegment::linear(3000.0, 0.0),
                EnvelopeSegment::exponential(2000.0, 0.5),
                EnvelopeSegment::exponential(1200.0, 3.0),
                EnvelopeSegment::exponential(800.0, 5.0),
            ],
        }
    }
}

impl FilterSettings {
    pub fn validate(&self) -> Result<(), SynthError> {
        if !(self.highpass_hz > 0.0) || !self.highpass_hz.is_finite() {
            return Err(SynthError::invalid_argument(format!(
                "high-pass cutoff must be positive, got {}",
                self.highpass_hz
            )));
        }
        if !self.highpass_q.is_finite() || !self.lowpass_q.is_finite() {
            return Err(SynthError::invalid_argument("filter Q must be finite"));
        }
        let curve = self.cutoff_curve()?;
        if curve.segments().iter().any(|s| s.target_value <= 0.0) {
            return Err(SynthError::invalid_argument(
                "low-pass cutoff must stay positive",
            ));
        }
        Ok(())
    }

    pub fn cutoff_curve(&self) -> Result<EnvelopeCurve, SynthError> {
        EnvelopeCurve::new(self.lowpass_cutoff.clone())
    }
}

/// High-pass feeding a low-pass whose cutoff darkens over time.
/// One input, one output.
#[derive(Debug, Clone)]
pub struct FilterChain {
    highpass: BiquadFilter,
    lowpass: BiquadFilter,
    cutoff_curve: EnvelopeCurve,
}

impl FilterChain {
    pub fn create(settings: &FilterSettings, sample_rate: f64) -> Result<Self, SynthError> {
        settings.validate()?;
        let cutoff_curve = settings.cutoff_curve()?;
        let initial_cutoff = cutoff_curve.segments()[0].target_value;

        Ok(FilterChain {
            highpass: BiquadFilter::new(
                FilterType::Highpass,
                settings.highpass_hz,
                settings.highpass_q,
                sample_rate,
            ),
            lowpass: BiquadFilter::new(
                FilterType::Lowpass,
                initial_cutoff,
                settings.lowpass_q,
                sample_rate,
            ),
            cutoff_curve,
        })
    }

    /// Schedule the cutoff movement relative to `origin`.
    pub fn schedule(&mut self, origin: f64) {
        self.cutoff_curve.schedule_onto(&mut self.lowpass.frequency, origin);
    }

    pub fn highpass(&self) -> &BiquadFilter {
        &self.highpass
    }

    pub fn lowpass(&self) -> &BiquadFilter {
        &self.lowpass
    }

    pub fn process(&mut self, input: f64, time: f64) -> f64 {
        let hp = self.highpass.process(input, time);
        self.lowpass.process(hp, time)
    }

    /// Clear both stages' memory and drop scheduled automation.
    pub fn release(&mut self) {
        self.highpass.reset();
        self.lowpass.reset();
        self.lowpass.frequency.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    fn steady_amplitude(filter: &mut BiquadFilter, freq: f64) -> f64 {
        let mut max_out = 0.0_f64;
        for i in 0..8820 {
            let t = i as f64 / SR;
            let out = filter.process((2.0 * PI * freq * t).sin(), t);
            if i > 4410 {
                max_out = max_out.max(out.abs());
            }
        }
        max_out
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut f = BiquadFilter::new(FilterType::Lowpass, 5000.0, 0.0, SR);
        let mut output = 0.0;
        for i in 0..1000 {
            output = f.process(1.0, i as f64 / SR);
        }
        assert!((output - 1.0).abs() < 0.001, "Lowpass should pass DC, got {output}");
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut f = BiquadFilter::new(FilterType::Highpass, 1000.0, 0.0, SR);
        let mut output = 0.0;
        for i in 0..1000 {
            output = f.process(1.0, i as f64 / SR);
        }
        assert!(output.abs() < 0.001, "Highpass should block DC, got {output}");
    }

    #[test]
    fn lowpass_attenuates_high_freq() {
        let mut f = BiquadFilter::new(FilterType::Lowpass, 200.0, 0.0, SR);
        let amp = steady_amplitude(&mut f, 10000.0);
        assert!(amp < 0.01, "Lowpass@200Hz should attenuate 10kHz, got {amp}");
    }

    #[test]
    fn cutoff_is_clamped_below_nyquist() {
        let f = BiquadFilter::new(FilterType::Lowpass, 30000.0, 0.0, 8000.0);
        assert!(f.cutoff_at(0.0) < 4000.0);
    }

    #[test]
    fn chain_cutoff_follows_brightness_decay() {
        let mut chain = FilterChain::create(&FilterSettings::default(), SR).unwrap();
        chain.schedule(0.0);
        let lp = chain.lowpass();
        assert_eq!(lp.cutoff_at(0.0), 3000.0);
        assert!((lp.cutoff_at(0.5) - 2000.0).abs() < 1e-9);
        assert!((lp.cutoff_at(3.0) - 1200.0).abs() < 1e-9);
        assert!((lp.cutoff_at(5.0) - 800.0).abs() < 1e-9);
        assert!((lp.cutoff_at(6.5) - 800.0).abs() < 1e-9);
        assert!(lp.cutoff_at(1.0) < lp.cutoff_at(0.75));
        assert_eq!(chain.highpass().cutoff_at(2.0), 80.0);
    }

    #[test]
    fn chain_output_stays_finite() {
        let mut chain = FilterChain::create(&FilterSettings::default(), SR).unwrap();
        chain.schedule(0.0);
        for i in 0..(SR as usize) {
            let t = i as f64 / SR;
            let input = if i % 100 == 0 { 1.0 } else { 0.0 };
            assert!(chain.process(input, t).is_finite(), "not finite at sample {i}");
        }
        chain.release();
        assert!(chain.lowpass().frequency.is_static());
    }

    #[test]
    fn rejects_non_positive_cutoff_settings() {
        let settings = FilterSettings {
            highpass_hz: 0.0,
            ..FilterSettings::default()
        };
        assert!(FilterChain::create(&settings, SR).is_err());
    }
}
