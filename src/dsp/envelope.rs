//! Envelope curves: time-ordered plans of target values.
//!
//! A curve is described once and scheduled onto any [`Automatable`] control
//! relative to an origin time. The first point is applied as a set-at-time;
//! every later point is a linear or exponential ramp ending at its offset.

use serde::{Deserialize, Serialize};

use crate::error::SynthError;

use super::param::{AudioParam, Automatable, FLOOR_EPSILON};

/// Interpolation used to reach a segment's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    Linear,
    Exponential,
}

/// One point of an envelope, relative to the note start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeSegment {
    #[serde(rename = "value")]
    pub target_value: f64,
    /// Seconds after the origin.
    #[serde(rename = "at")]
    pub time_offset: f64,
    pub curve: Curve,
}

impl EnvelopeSegment {
    pub fn linear(target_value: f64, time_offset: f64) -> Self {
        EnvelopeSegment {
            target_value,
            time_offset,
            curve: Curve::Linear,
        }
    }

    pub fn exponential(target_value: f64, time_offset: f64) -> Self {
        EnvelopeSegment {
            target_value,
            time_offset,
            curve: Curve::Exponential,
        }
    }
}

/// A validated, strictly time-ordered list of envelope segments.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeCurve {
    segments: Vec<EnvelopeSegment>,
}

impl EnvelopeCurve {
    /// Validate and normalize `segments`.
    ///
    /// Offsets must be finite, non-negative and strictly increasing; targets
    /// must be finite and non-negative. Exponential targets of zero are
    /// raised to [`FLOOR_EPSILON`], and an exponential segment may not start
    /// from a point at zero.
    pub fn new(segments: Vec<EnvelopeSegment>) -> Result<Self, SynthError> {
        if segments.is_empty() {
            return Err(SynthError::invalid_argument(
                "an envelope needs at least one segment",
            ));
        }

        let mut normalized: Vec<EnvelopeSegment> = Vec::with_capacity(segments.len());
        for (i, seg) in segments.into_iter().enumerate() {
            if !seg.time_offset.is_finite() || seg.time_offset < 0.0 {
                return Err(SynthError::invalid_argument(format!(
                    "envelope segment {i} has invalid offset {}",
                    seg.time_offset
                )));
            }
            if !seg.target_value.is_finite() || seg.target_value < 0.0 {
                return Err(SynthError::invalid_argument(format!(
                    "envelope segment {i} has invalid target {}",
                    seg.target_value
                )));
            }

            let mut seg = seg;
            if let Some(prev) = normalized.last() {
                if seg.time_offset <= prev.time_offset {
                    return Err(SynthError::invalid_argument(format!(
                        "envelope segment {i} at {}s does not follow {}s",
                        seg.time_offset, prev.time_offset
                    )));
                }
                if seg.curve == Curve::Exponential {
                    if prev.target_value <= 0.0 {
                        return Err(SynthError::invalid_argument(format!(
                            "envelope segment {i} ramps exponentially away from zero"
                        )));
                    }
                    seg.target_value = seg.target_value.max(FLOOR_EPSILON);
                }
            }
            normalized.push(seg);
        }

        Ok(EnvelopeCurve {
            segments: normalized,
        })
    }

    /// Start a builder whose first point is `value` at `offset`.
    pub fn starting_at(value: f64, offset: f64) -> EnvelopeBuilder {
        EnvelopeBuilder {
            segments: vec![EnvelopeSegment::linear(value, offset)],
        }
    }

    pub fn segments(&self) -> &[EnvelopeSegment] {
        &self.segments
    }

    /// Offset of the first point.
    pub fn start_offset(&self) -> f64 {
        self.segments[0].time_offset
    }

    /// Offset of the last point; the value is held afterwards.
    pub fn end_offset(&self) -> f64 {
        self.segments[self.segments.len() - 1].time_offset
    }

    /// Time from the first point to the last.
    pub fn duration(&self) -> f64 {
        self.end_offset() - self.start_offset()
    }

    /// The same timing with every target multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Result<EnvelopeCurve, SynthError> {
        EnvelopeCurve::new(
            self.segments
                .iter()
                .map(|s| EnvelopeSegment {
                    target_value: s.target_value * factor,
                    ..*s
                })
                .collect(),
        )
    }

    pub fn peak(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.target_value)
            .fold(f64::MIN, f64::max)
    }

    pub fn final_value(&self) -> f64 {
        self.segments[self.segments.len() - 1].target_value
    }

    /// Emit one scheduling instruction per segment, in order, at
    /// `origin + offset`.
    pub fn schedule_onto<P: Automatable + ?Sized>(&self, param: &mut P, origin: f64) {
        let Some((first, rest)) = self.segments.split_first() else {
            return;
        };
        param.set_value_at_time(first.target_value, origin + first.time_offset);
        for seg in rest {
            let at = origin + seg.time_offset;
            match seg.curve {
                Curve::Linear => param.linear_ramp_to_value_at_time(seg.target_value, at),
                Curve::Exponential => {
                    param.exponential_ramp_to_value_at_time(seg.target_value, at)
                }
            }
        }
    }

    /// Value of the curve `offset` seconds after its origin.
    pub fn value_at(&self, offset: f64) -> f64 {
        let mut param = AudioParam::new(0.0);
        self.schedule_onto(&mut param, 0.0);
        param.value_at(offset)
    }
}

/// Fluent construction of an [`EnvelopeCurve`]; validation happens in `build`.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    segments: Vec<EnvelopeSegment>,
}

impl EnvelopeBuilder {
    pub fn linear_to(mut self, value: f64, offset: f64) -> Self {
        self.segments.push(EnvelopeSegment::linear(value, offset));
        self
    }

    pub fn exponential_to(mut self, value: f64, offset: f64) -> Self {
        self.segments.push(EnvelopeSegment::exponential(value, offset));
        self
    }

    pub fn build(self) -> Result<EnvelopeCurve, SynthError> {
        EnvelopeCurve::new(self.segments)
    }
}
