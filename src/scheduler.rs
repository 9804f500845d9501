//! Triggers a sequence of notes with delays between them.

use std::time::Duration;

use log::info;

use crate::dsp::harmonics::validate_fundamental;
use crate::engine::{NoteHandle, PianoEngine};
use crate::error::SynthError;
use crate::notes::PianoNotes;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteStep {
    pub fundamental_hz: f64,
    /// Wait after triggering this note before the next one.
    pub delay_after: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteScheduler {
    steps: Vec<NoteStep>,
}

impl NoteScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A4, then E4 200ms later, then middle C 800ms after that.
    pub fn demo() -> Self {
        NoteScheduler::new()
            .then(PianoNotes::A4, Duration::from_millis(200))
            .then(PianoNotes::E4, Duration::from_millis(800))
            .then(PianoNotes::C4, Duration::ZERO)
    }

    pub fn then(mut self, fundamental_hz: f64, delay_after: Duration) -> Self {
        self.steps.push(NoteStep {
            fundamental_hz,
            delay_after,
        });
        self
    }

    pub fn steps(&self) -> &[NoteStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Time from the first trigger to the last.
    pub fn span(&self) -> Duration {
        match self.steps.split_last() {
            Some((_, init)) => init.iter().map(|s| s.delay_after).sum(),
            None => Duration::ZERO,
        }
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        for (i, step) in self.steps.iter().enumerate() {
            validate_fundamental(step.fundamental_hz).map_err(|e| {
                SynthError::invalid_argument(format!("sequence step {i}: {e}"))
            })?;
        }
        Ok(())
    }

    /// Trigger every step in order, waiting each step's delay. Every step is
    /// validated before the first note sounds. Returns without waiting for
    /// the notes themselves; await the handles for that.
    pub async fn run(&self, engine: &PianoEngine) -> Result<Vec<NoteHandle>, SynthError> {
        self.validate()?;

        let mut handles = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            info!(
                "sequence step {}/{}: {:.2}Hz",
                i + 1,
                self.steps.len(),
                step.fundamental_hz
            );
            handles.push(engine.create_note(step.fundamental_hz)?);
            if !step.delay_after.is_zero() {
                tokio::time::sleep(step.delay_after).await;
            }
        }
        Ok(handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthConfig;
    use crate::dsp::sink::MemorySink;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn demo_sequence_layout() {
        let demo = NoteScheduler::demo();
        let hz: Vec<f64> = demo.steps().iter().map(|s| s.fundamental_hz).collect();
        assert_eq!(hz, vec![440.0, 329.63, 261.63]);
        assert_eq!(demo.span(), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn invalid_step_fails_before_anything_plays() {
        let sink = Arc::new(MemorySink::new());
        let engine = PianoEngine::new(SynthConfig::default(), sink.clone()).unwrap();
        let seq = NoteScheduler::new()
            .then(440.0, Duration::from_millis(10))
            .then(0.0, Duration::ZERO);
        let err = seq.run(&engine).await.unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("step 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_triggers_with_delays() {
        let sink = Arc::new(MemorySink::new());
        let config = SynthConfig {
            sample_rate: 8000,
            ..SynthConfig::default()
        };
        let engine = PianoEngine::new(config, sink.clone()).unwrap();

        let start = Instant::now();
        let handles = NoteScheduler::demo().run(&engine).await.unwrap();
        assert_eq!(handles.len(), 3);
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(start.elapsed() < Duration::from_millis(1100));

        for handle in handles {
            handle.await;
        }
        assert!(start.elapsed() >= Duration::from_millis(8000));

        let mut notes = sink.take();
        notes.sort_by_key(|n| n.info.id);
        assert_eq!(notes.len(), 3);
        // Every note renders its full life from its own origin.
        for note in &notes {
            assert!((note.duration_secs() - 7.0).abs() < 1e-9);
        }
    }
}
