//! Synthesis configuration.
//!
//! Every field has a default reproducing the stock piano voice, so a config
//! file only needs the values it changes:
//!
//! ```json
//! { "sampleRate": 48000, "harmonicCount": 12, "decay": { "rateSlope": 0.4 } }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dsp::envelope::{EnvelopeCurve, EnvelopeSegment};
use crate::dsp::filter::FilterSettings;
use crate::dsp::harmonics::{DEFAULT_HARMONIC_COUNT, DecayProfile, HarmonicProfile};
use crate::dsp::oscillator::Waveform;
use crate::error::{ConfigError, SynthError};

/// Lowest supported render rate.
pub const MIN_SAMPLE_RATE: u32 = 3000;

/// Longest note a session will hold open.
pub const MAX_NOTE_DURATION_SECS: f64 = 3600.0;

/// Most frames a single note may render.
pub const MAX_RENDER_FRAMES: f64 = (1u64 << 28) as f64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthConfig {
    pub sample_rate: u32,
    /// Scales every partial's peak amplitude.
    pub global_scale: f64,
    pub harmonic_count: usize,
    /// Time from start until a note is stopped and released.
    pub note_duration_secs: f64,
    /// Gain applied after the master envelope.
    pub output_gain: f64,
    /// Waveform of the single-generator note.
    pub pure_waveform: Waveform,
    pub harmonics: HarmonicProfile,
    pub decay: DecayProfile,
    pub filter: FilterSettings,
    pub master_envelope: Vec<EnvelopeSegment>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            sample_rate: 44100,
            global_scale: 0.15,
            harmonic_count: DEFAULT_HARMONIC_COUNT,
            note_duration_secs: 7.0,
            output_gain: 1.0,
            pure_waveform: Waveform::Sine,
            harmonics: HarmonicProfile::default(),
            decay: DecayProfile::default(),
            filter: FilterSettings::default(),
            master_envelope: vec![
                EnvelopeSegment::linear(0.0, 0.0),
                EnvelopeSegment::linear(1.0, 0.005),
                EnvelopeSegment::exponential(0.8, 0.1),
                EnvelopeSegment::exponential(0.6, 1.5),
                EnvelopeSegment::exponential(0.4, 3.0),
                EnvelopeSegment::exponential(0.0, 6.0),
            ],
        }
    }
}

impl SynthConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SynthError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        config.validate()?;
        log::debug!("loaded synth config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        if self.sample_rate < MIN_SAMPLE_RATE {
            return Err(SynthError::invalid_argument(format!(
                "sample rate must be at least {MIN_SAMPLE_RATE}, got {}",
                self.sample_rate
            )));
        }
        if !(self.global_scale > 0.0) || !self.global_scale.is_finite() {
            return Err(SynthError::invalid_argument(format!(
                "global scale must be positive, got {}",
                self.global_scale
            )));
        }
        if !(self.note_duration_secs > 0.0 && self.note_duration_secs <= MAX_NOTE_DURATION_SECS)
            || Duration::try_from_secs_f64(self.note_duration_secs).is_err()
        {
            return Err(SynthError::invalid_argument(format!(
                "note duration must be in (0, {MAX_NOTE_DURATION_SECS}]s, got {}",
                self.note_duration_secs
            )));
        }
        let frames = self.note_duration_secs * self.sample_rate as f64;
        if frames > MAX_RENDER_FRAMES {
            return Err(SynthError::invalid_argument(format!(
                "{}s at {}Hz is {frames} frames, more than {MAX_RENDER_FRAMES}",
                self.note_duration_secs, self.sample_rate
            )));
        }
        if !(self.output_gain >= 0.0) || !self.output_gain.is_finite() {
            return Err(SynthError::invalid_argument(format!(
                "output gain must be non-negative, got {}",
                self.output_gain
            )));
        }
        self.harmonics.validate()?;
        self.harmonics.check_count(self.harmonic_count)?;
        self.decay.validate()?;
        self.filter.validate()?;

        let master = self.master_curve()?;
        if master.end_offset() > self.note_duration_secs {
            log::warn!(
                "master envelope ends at {}s, after the {}s note duration; the tail will be cut",
                master.end_offset(),
                self.note_duration_secs
            );
        }
        Ok(())
    }

    pub fn master_curve(&self) -> Result<EnvelopeCurve, SynthError> {
        EnvelopeCurve::new(self.master_envelope.clone())
    }

    /// Note duration; out-of-range values collapse to zero rather than panic.
    pub fn note_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.note_duration_secs.min(MAX_NOTE_DURATION_SECS))
            .unwrap_or_default()
    }
}
