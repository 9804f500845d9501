//! Note session — one note's graph and lifecycle.
//!
//! ```text
//! Idle ──start()──▶ Sounding ──stop()──▶ Released
//!   └──────────────stop()───────────────────▲
//! ```
//!
//! All automation is scheduled once, at `start`, relative to a single origin.
//! `stop` renders and releases the graph and then resolves the completion
//! signal. `Released` is terminal.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime};

use log::{debug, error, info};
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::config::SynthConfig;
use crate::dsp::context::RenderContext;
use crate::dsp::graph::{NoteGraph, NotePlan, Voicing};
use crate::dsp::sink::{NoteInfo, OutputSink};
use crate::error::SynthError;

/// Context time every session schedules against.
const ORIGIN: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sounding,
    Released,
}

/// Resolves once the session has released its resources.
///
/// Also resolves if the session is dropped without being stopped, since
/// dropping releases everything it owned.
#[derive(Debug)]
pub struct CompletionSignal {
    rx: oneshot::Receiver<()>,
    done: bool,
}

impl CompletionSignal {
    fn new(rx: oneshot::Receiver<()>) -> Self {
        CompletionSignal { rx, done: false }
    }

    /// Non-blocking check.
    pub fn is_complete(&mut self) -> bool {
        if !self.done {
            self.done = !matches!(self.rx.try_recv(), Err(oneshot::error::TryRecvError::Empty));
        }
        self.done
    }
}

impl Future for CompletionSignal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.done {
            return Poll::Ready(());
        }
        let ready = Pin::new(&mut self.rx).poll(cx).is_ready();
        if ready {
            self.done = true;
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

pub struct NoteSession {
    id: u64,
    plan: NotePlan,
    config: Arc<SynthConfig>,
    sink: Arc<dyn OutputSink>,
    state: SessionState,
    context: Option<RenderContext>,
    started_at: Option<Instant>,
    completion: Option<oneshot::Sender<()>>,
}

impl NoteSession {
    /// Validate a note and create its idle session.
    ///
    /// Fails with `InvalidArgument` before anything is built.
    pub fn new(
        id: u64,
        fundamental_hz: f64,
        voicing: Voicing,
        config: Arc<SynthConfig>,
        sink: Arc<dyn OutputSink>,
    ) -> Result<(Self, CompletionSignal), SynthError> {
        let plan = NotePlan::new(fundamental_hz, voicing, &config)?;
        let (tx, rx) = oneshot::channel();
        let session = NoteSession {
            id,
            plan,
            config,
            sink,
            state: SessionState::Idle,
            context: None,
            started_at: None,
            completion: Some(tx),
        };
        Ok((session, CompletionSignal::new(rx)))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn fundamental_hz(&self) -> f64 {
        self.plan.fundamental_hz
    }

    pub fn voicing(&self) -> Voicing {
        self.plan.voicing
    }

    /// How long the note sounds before it is stopped.
    pub fn total_duration(&self) -> Duration {
        self.config.note_duration()
    }

    /// The sounding graph, while the session is `Sounding`.
    pub fn graph(&self) -> Option<&NoteGraph> {
        self.context.as_ref().and_then(|ctx| ctx.graph())
    }

    /// Time since `start`, or zero when not started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Build the graph, schedule all automation and start every generator.
    pub fn start(&mut self) -> Result<(), SynthError> {
        if self.state != SessionState::Idle {
            return Err(SynthError::invalid_state(format!(
                "note {} cannot start from {:?}",
                self.id, self.state
            )));
        }

        let mut graph = NoteGraph::build(&self.plan, &self.config)?;
        graph.start(ORIGIN)?;

        let info = NoteInfo {
            id: self.id,
            fundamental_hz: self.plan.fundamental_hz,
            voicing: self.plan.voicing,
            started_at: SystemTime::now(),
        };
        self.context = Some(RenderContext::acquire(
            info,
            self.config.sample_rate,
            graph,
            self.sink.clone(),
        ));
        self.started_at = Some(Instant::now());
        self.state = SessionState::Sounding;
        info!(
            "note {}: {} note at {:.2}Hz started ({} voices)",
            self.id,
            self.plan.voicing,
            self.plan.fundamental_hz,
            self.plan.partials.len()
        );
        Ok(())
    }

    /// Stop generation, release the graph and resolve the completion signal.
    ///
    /// Stopping a sounding session cannot fail; a failing sink is logged.
    /// Stopping a released session is `InvalidState`.
    pub fn stop(&mut self) -> Result<(), SynthError> {
        match self.state {
            SessionState::Released => {
                return Err(SynthError::invalid_state(format!(
                    "note {} already released",
                    self.id
                )));
            }
            SessionState::Idle => {
                debug!("note {}: released before start", self.id);
            }
            SessionState::Sounding => {
                let until = ORIGIN + self.elapsed().min(self.total_duration()).as_secs_f64();
                if let Some(mut ctx) = self.context.take() {
                    if let Err(e) = ctx.stop_generators(until) {
                        error!("note {}: stopping generators failed: {e}", self.id);
                    }
                    if let Err(e) = ctx.close(until) {
                        error!("note {}: output sink failed: {e}", self.id);
                    }
                }
                info!(
                    "note {}: {} note at {:.2}Hz finished",
                    self.id, self.plan.voicing, self.plan.fundamental_hz
                );
            }
        }

        self.state = SessionState::Released;
        if let Some(tx) = self.completion.take() {
            let _ = tx.send(());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::sink::MemorySink;

    fn config() -> Arc<SynthConfig> {
        Arc::new(SynthConfig {
            sample_rate: 8000,
            ..SynthConfig::default()
        })
    }

    fn session(hz: f64, sink: Arc<MemorySink>) -> (NoteSession, CompletionSignal) {
        NoteSession::new(1, hz, Voicing::Piano, config(), sink).unwrap()
    }

    #[test]
    fn invalid_fundamental_fails_before_anything_exists() {
        let sink = Arc::new(MemorySink::new());
        for hz in [0.0, -261.63] {
            let err = NoteSession::new(1, hz, Voicing::Piano, config(), sink.clone())
                .err()
                .unwrap();
            assert!(err.is_invalid_argument());
        }
        assert!(sink.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_idle_sounding_released() {
        let sink = Arc::new(MemorySink::new());
        let (mut s, mut done) = session(440.0, sink.clone());
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.graph().is_none());

        s.start().unwrap();
        assert_eq!(s.state(), SessionState::Sounding);
        assert_eq!(s.graph().unwrap().voices().len(), 8);
        assert!(!done.is_complete());

        tokio::time::advance(Duration::from_secs(1)).await;
        s.stop().unwrap();
        assert_eq!(s.state(), SessionState::Released);
        assert!(s.graph().is_none());
        done.await;

        let notes = sink.take();
        assert_eq!(notes.len(), 1);
        assert!((notes[0].duration_secs() - 1.0).abs() < 1e-3);
    }

    #[tokio::test(start_paused = true)]
    async fn double_stop_is_invalid_state_and_writes_once() {
        let sink = Arc::new(MemorySink::new());
        let (mut s, done) = session(329.63, sink.clone());
        s.start().unwrap();
        s.stop().unwrap();
        assert!(s.stop().unwrap_err().is_invalid_state());
        done.await;
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn start_is_only_valid_from_idle() {
        let sink = Arc::new(MemorySink::new());
        let (mut s, _done) = session(440.0, sink);
        s.stop().unwrap();
        assert!(s.start().unwrap_err().is_invalid_state());
    }

    #[tokio::test]
    async fn stopping_idle_session_resolves_without_audio() {
        let sink = Arc::new(MemorySink::new());
        let (mut s, done) = session(440.0, sink.clone());
        s.stop().unwrap();
        done.await;
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn dropping_session_resolves_signal() {
        let sink = Arc::new(MemorySink::new());
        let (s, done) = session(440.0, sink);
        drop(s);
        done.await;
    }

    #[tokio::test(start_paused = true)]
    async fn render_is_clamped_to_note_duration() {
        let sink = Arc::new(MemorySink::new());
        let (mut s, _done) = session(261.63, sink.clone());
        s.start().unwrap();
        tokio::time::advance(Duration::from_secs(9)).await;
        s.stop().unwrap();
        let notes = sink.take();
        assert!((notes[0].duration_secs() - 7.0).abs() < 1e-9);
    }
}
