//! AudioParam — a schedulable control value with WebAudio automation semantics.
//!
//! Values are scheduled ahead of time as a timeline of events and evaluated
//! per sample while rendering. Times are in seconds of context time.

/// Smallest value an exponential ramp may target.
pub const FLOOR_EPSILON: f64 = 0.001;

/// A control that accepts scheduled values. Envelopes are written against
/// this trait so they can drive any parameter (gain, cutoff, detune).
pub trait Automatable {
    fn set_value_at_time(&mut self, value: f64, time: f64);
    fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64);
    fn exponential_ramp_to_value_at_time(&mut self, value: f64, time: f64);
}

/// One entry in a parameter's automation timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    SetValue { value: f64, time: f64 },
    LinearRamp { value: f64, time: f64 },
    ExponentialRamp { value: f64, time: f64 },
}

impl AutomationEvent {
    pub fn time(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { time, .. }
            | AutomationEvent::LinearRamp { time, .. }
            | AutomationEvent::ExponentialRamp { time, .. } => time,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { value, .. }
            | AutomationEvent::LinearRamp { value, .. }
            | AutomationEvent::ExponentialRamp { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioParam {
    default_value: f64,
    events: Vec<AutomationEvent>,
}

impl AudioParam {
    pub fn new(default_value: f64) -> Self {
        AudioParam {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Scheduled events, sorted by time.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// True when nothing has been scheduled.
    pub fn is_static(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every scheduled event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    // Events with equal times keep insertion order.
    fn insert(&mut self, event: AutomationEvent) {
        let idx = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(idx, event);
    }

    /// Evaluate the parameter at `time`.
    ///
    /// A ramp interpolates from the previous event's (time, value) to its own;
    /// a ramp with no predecessor starts from the default value at time 0.
    /// After the last event the final value is held.
    pub fn value_at(&self, time: f64) -> f64 {
        let next = self.events.partition_point(|e| e.time() <= time);
        let (t0, v0) = match next.checked_sub(1) {
            Some(i) => (self.events[i].time(), self.events[i].value()),
            None => (0.0, self.default_value),
        };

        match self.events.get(next) {
            Some(&AutomationEvent::LinearRamp { value: v1, time: t1 }) => {
                let span = t1 - t0;
                if span <= 0.0 {
                    return v1;
                }
                let x = ((time - t0) / span).clamp(0.0, 1.0);
                v0 + (v1 - v0) * x
            }
            Some(&AutomationEvent::ExponentialRamp { value: v1, time: t1 }) => {
                // Opposite signs or a zero start hold the previous value.
                if v0 * v1 <= 0.0 {
                    return v0;
                }
                let span = t1 - t0;
                if span <= 0.0 {
                    return v1;
                }
                let x = ((time - t0) / span).clamp(0.0, 1.0);
                v0 * (v1 / v0).powf(x)
            }
            _ => v0,
        }
    }
}

impl Automatable for AudioParam {
    fn set_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(AutomationEvent::SetValue { value, time });
    }

    fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(AutomationEvent::LinearRamp { value, time });
    }

    fn exponential_ramp_to_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(AutomationEvent::ExponentialRamp {
            value: value.max(FLOOR_EPSILON),
            time,
        });
    }
}
