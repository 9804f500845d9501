//! Harmonic series model for a slightly inharmonic piano tone.

use serde::{Deserialize, Serialize};

use crate::error::SynthError;

pub const DEFAULT_HARMONIC_COUNT: usize = 8;

/// Most partials a note may have.
pub const MAX_HARMONIC_COUNT: usize = 64;

/// Quietest amplitude ratio a partial may be given.
pub const MIN_AMPLITUDE_RATIO: f64 = 1e-9;

/// One sine component of a note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Partial {
    pub frequency_hz: f64,
    /// Relative amplitude in (0, 1].
    pub amplitude_ratio: f64,
    pub detune_cents: f64,
}

impl Partial {
    /// Frequency after applying the detune.
    pub fn effective_frequency(&self) -> f64 {
        self.frequency_hz * 2.0_f64.powf(self.detune_cents / 1200.0)
    }
}

/// Amplitude and detune shape of the series.
///
/// Amplitudes come from `amplitudes` for the first harmonics and continue
/// geometrically by `tail_factor` past the end of the table. Detune grows by
/// `detune_step_cents` per harmonic above the fundamental.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HarmonicProfile {
    pub amplitudes: Vec<f64>,
    pub tail_factor: f64,
    pub detune_step_cents: f64,
}

impl Default for HarmonicProfile {
    fn default() -> Self {
        HarmonicProfile {
            amplitudes: vec![1.0, 0.8, 0.6, 0.5, 0.4, 0.3, 0.25, 0.2],
            tail_factor: 0.8,
            detune_step_cents: 2.0,
        }
    }
}

impl HarmonicProfile {
    pub fn validate(&self) -> Result<(), SynthError> {
        if self.amplitudes.is_empty() {
            return Err(SynthError::invalid_argument(
                "harmonic amplitude table is empty",
            ));
        }
        let mut prev = f64::INFINITY;
        for (i, &amp) in self.amplitudes.iter().enumerate() {
            if !(amp > 0.0 && amp <= 1.0) {
                return Err(SynthError::invalid_argument(format!(
                    "harmonic amplitude {i} must be in (0, 1], got {amp}"
                )));
            }
            if amp >= prev {
                return Err(SynthError::invalid_argument(format!(
                    "harmonic amplitudes must strictly decrease (index {i})"
                )));
            }
            prev = amp;
        }
        if !(self.tail_factor > 0.0 && self.tail_factor < 1.0) {
            return Err(SynthError::invalid_argument(format!(
                "tail factor must be in (0, 1), got {}",
                self.tail_factor
            )));
        }
        if !self.detune_step_cents.is_finite() || self.detune_step_cents < 0.0 {
            return Err(SynthError::invalid_argument(format!(
                "detune step must be non-negative, got {}",
                self.detune_step_cents
            )));
        }
        Ok(())
    }

    /// Amplitude ratio of harmonic `k` (1-indexed).
    pub fn amplitude_ratio(&self, k: usize) -> f64 {
        let table = &self.amplitudes;
        if k <= table.len() {
            table[k - 1]
        } else {
            let last = table[table.len() - 1];
            last * self.tail_factor.powi((k - table.len()) as i32)
        }
    }

    /// Check that harmonics 1..=`harmonic_count` all have a usable, strictly
    /// decreasing amplitude.
    pub fn check_count(&self, harmonic_count: usize) -> Result<(), SynthError> {
        if !(1..=MAX_HARMONIC_COUNT).contains(&harmonic_count) {
            return Err(SynthError::invalid_argument(format!(
                "harmonic count must be between 1 and {MAX_HARMONIC_COUNT}, got {harmonic_count}"
            )));
        }
        let mut prev = f64::INFINITY;
        for k in 1..=harmonic_count {
            let ratio = self.amplitude_ratio(k);
            if !(ratio >= MIN_AMPLITUDE_RATIO && ratio < prev) {
                return Err(SynthError::invalid_argument(format!(
                    "harmonic {k} amplitude {ratio:e} is below {MIN_AMPLITUDE_RATIO:e} \
                     or does not decrease; lower the harmonic count"
                )));
            }
            prev = ratio;
        }
        Ok(())
    }

    /// Detune of harmonic `k` (1-indexed) in cents.
    pub fn detune_cents(&self, k: usize) -> f64 {
        self.detune_step_cents * (k - 1) as f64
    }
}

/// Per-partial decay: `rate = base + index × slope` (index 0 is the
/// fundamental), plus the envelope stages each partial walks through.
///
/// Stage offsets are the fundamental's; a partial with rate `r` reaches each
/// stage at `attack + (offset − attack) / r`, so higher partials die first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecayProfile {
    pub rate_base: f64,
    pub rate_slope: f64,
    pub attack_secs: f64,
    pub stages: Vec<DecayStage>,
    /// Offset at which the partial reaches the floor.
    pub floor_offset_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayStage {
    /// Fraction of the partial's peak.
    pub fraction: f64,
    #[serde(rename = "at")]
    pub offset_secs: f64,
}

impl Default for DecayProfile {
    fn default() -> Self {
        DecayProfile {
            rate_base: 1.0,
            rate_slope: 0.3,
            attack_secs: 0.01,
            stages: vec![
                DecayStage { fraction: 0.5, offset_secs: 0.1 },
                DecayStage { fraction: 0.3, offset_secs: 1.0 },
                DecayStage { fraction: 0.15, offset_secs: 3.0 },
            ],
            floor_offset_secs: 5.0,
        }
    }
}

impl DecayProfile {
    pub fn validate(&self) -> Result<(), SynthError> {
        if !(self.rate_base > 0.0) || !self.rate_slope.is_finite() || self.rate_slope < 0.0 {
            return Err(SynthError::invalid_argument(format!(
                "decay rate must be positive and non-decreasing (base {}, slope {})",
                self.rate_base, self.rate_slope
            )));
        }
        if !(self.attack_secs > 0.0) {
            return Err(SynthError::invalid_argument(format!(
                "partial attack must be positive, got {}",
                self.attack_secs
            )));
        }
        let mut prev = self.attack_secs;
        for stage in &self.stages {
            if !(stage.fraction > 0.0 && stage.fraction <= 1.0) {
                return Err(SynthError::invalid_argument(format!(
                    "decay fraction must be in (0, 1], got {}",
                    stage.fraction
                )));
            }
            if !(stage.offset_secs > prev) {
                return Err(SynthError::invalid_argument(format!(
                    "decay stage at {}s does not follow {prev}s",
                    stage.offset_secs
                )));
            }
            prev = stage.offset_secs;
        }
        if !(self.floor_offset_secs > prev) || !self.floor_offset_secs.is_finite() {
            return Err(SynthError::invalid_argument(format!(
                "floor offset {}s does not follow {prev}s",
                self.floor_offset_secs
            )));
        }
        Ok(())
    }

    pub fn decay_rate(&self, harmonic_index: usize) -> f64 {
        self.rate_base + harmonic_index as f64 * self.rate_slope
    }

    /// Map a fundamental stage offset onto harmonic `harmonic_index`.
    pub fn scaled_offset(&self, offset_secs: f64, harmonic_index: usize) -> f64 {
        let attack = self.attack_secs;
        attack + (offset_secs - attack) / self.decay_rate(harmonic_index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HarmonicSeriesModel {
    profile: HarmonicProfile,
}

impl HarmonicSeriesModel {
    pub fn new(profile: HarmonicProfile) -> Result<Self, SynthError> {
        profile.validate()?;
        Ok(HarmonicSeriesModel { profile })
    }

    pub fn profile(&self) -> &HarmonicProfile {
        &self.profile
    }

    /// Partials 1..=`harmonic_count` of `fundamental_hz`.
    pub fn generate(
        &self,
        fundamental_hz: f64,
        harmonic_count: usize,
    ) -> Result<Vec<Partial>, SynthError> {
        validate_fundamental(fundamental_hz)?;
        self.profile.check_count(harmonic_count)?;

        Ok((1..=harmonic_count)
            .map(|k| Partial {
                frequency_hz: fundamental_hz * k as f64,
                amplitude_ratio: self.profile.amplitude_ratio(k),
                detune_cents: self.profile.detune_cents(k),
            })
            .collect())
    }
}

/// Generate with the default profile.
pub fn generate(fundamental_hz: f64, harmonic_count: usize) -> Result<Vec<Partial>, SynthError> {
    HarmonicSeriesModel::default().generate(fundamental_hz, harmonic_count)
}

pub fn validate_fundamental(fundamental_hz: f64) -> Result<(), SynthError> {
    if fundamental_hz.is_finite() && fundamental_hz > 0.0 {
        Ok(())
    } else {
        Err(SynthError::invalid_argument(format!(
            "fundamental must be a positive frequency, got {fundamental_hz}"
        )))
    }
}
