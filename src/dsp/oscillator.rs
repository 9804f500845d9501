//! Anti-aliased oscillators with scheduled start and stop.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::SynthError;

use super::param::AudioParam;

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// An oscillator whose frequency and detune (cents) are automatable.
///
/// Silent until its start time and after its stop time. Phase is zero at the
/// first rendered sample, so oscillators started at the same time stay aligned.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub frequency: AudioParam,
    pub detune: AudioParam,
    phase: f64,
    start_time: Option<f64>,
    stop_time: Option<f64>,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency_hz: f64) -> Self {
        Oscillator {
            waveform,
            frequency: AudioParam::new(frequency_hz),
            detune: AudioParam::new(0.0),
            phase: 0.0,
            start_time: None,
            stop_time: None,
        }
    }

    /// Schedule generation to begin at `time`. An oscillator starts once.
    pub fn start(&mut self, time: f64) -> Result<(), SynthError> {
        if self.start_time.is_some() {
            return Err(SynthError::invalid_state("oscillator already started"));
        }
        self.start_time = Some(time);
        Ok(())
    }

    /// Schedule generation to end at `time`. Stopping twice is an error.
    pub fn stop(&mut self, time: f64) -> Result<(), SynthError> {
        let Some(start) = self.start_time else {
            return Err(SynthError::invalid_state("oscillator stopped before start"));
        };
        if self.stop_time.is_some() {
            return Err(SynthError::invalid_state("oscillator already stopped"));
        }
        self.stop_time = Some(time.max(start));
        Ok(())
    }

    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    pub fn stop_time(&self) -> Option<f64> {
        self.stop_time
    }

    pub fn is_active_at(&self, time: f64) -> bool {
        match (self.start_time, self.stop_time) {
            (Some(start), Some(stop)) => time >= start && time < stop,
            (Some(start), None) => time >= start,
            _ => false,
        }
    }

    /// Frequency after detune at `time`.
    pub fn computed_frequency(&self, time: f64) -> f64 {
        self.frequency.value_at(time) * 2.0_f64.powf(self.detune.value_at(time) / 1200.0)
    }

    /// Generate the sample at `time`, advancing phase by one frame.
    pub fn next_sample(&mut self, time: f64, sample_rate: f64) -> f64 {
        if !self.is_active_at(time) {
            return 0.0;
        }

        let inc = self.computed_frequency(time) / sample_rate;
        let sample = match self.waveform {
            Waveform::Sine => (2.0 * PI * self.phase).sin(),
            Waveform::Sawtooth => 2.0 * self.phase - 1.0 - poly_blep(self.phase, inc),
            Waveform::Square => {
                let naive = if self.phase < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(self.phase, inc) - poly_blep((self.phase + 0.5) % 1.0, inc)
            }
            Waveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
        };

        self.phase += inc;
        self.phase -= self.phase.floor();
        sample
    }
}

/// PolyBLEP correction around a waveform discontinuity.
///
/// `t` is the phase [0, 1), `dt` the phase increment per sample.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}
