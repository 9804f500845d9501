//! Piano engine — triggers note sessions and drives them to completion.
//!
//! Each trigger creates an independent [`NoteSession`] and a driver task that
//! waits out the note duration (or an early stop), then tears the session
//! down. Sessions share nothing but the configuration and the output sink.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use log::{debug, error, warn};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::config::SynthConfig;
use crate::dsp::graph::Voicing;
use crate::dsp::sink::{NullSink, OutputSink};
use crate::error::SynthError;
use crate::session::{CompletionSignal, NoteSession};

pub struct PianoEngine {
    config: Arc<SynthConfig>,
    sink: Arc<dyn OutputSink>,
    next_id: AtomicU64,
}

/// A triggered note. Await it to wait for the note's release.
///
/// Dropping the handle does not stop the note.
#[derive(Debug)]
pub struct NoteHandle {
    id: u64,
    fundamental_hz: f64,
    completion: CompletionSignal,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl NoteHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn fundamental_hz(&self) -> f64 {
        self.fundamental_hz
    }

    /// Ask the note to stop now instead of waiting for its timer. Returns
    /// false if a stop was already requested or the note has finished.
    pub fn stop(&mut self) -> bool {
        match self.stop_tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub fn is_finished(&mut self) -> bool {
        self.completion.is_complete()
    }

    pub fn into_signal(self) -> CompletionSignal {
        self.completion
    }
}

impl Future for NoteHandle {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.completion).poll(cx)
    }
}

impl Default for PianoEngine {
    fn default() -> Self {
        PianoEngine {
            config: Arc::new(SynthConfig::default()),
            sink: Arc::new(NullSink),
            next_id: AtomicU64::new(1),
        }
    }
}

impl PianoEngine {
    pub fn new(config: SynthConfig, sink: Arc<dyn OutputSink>) -> Result<Self, SynthError> {
        config.validate()?;
        Ok(PianoEngine {
            config: Arc::new(config),
            sink,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Start a full piano note. Must be called within a tokio runtime.
    pub fn create_note(&self, fundamental_hz: f64) -> Result<NoteHandle, SynthError> {
        self.trigger(fundamental_hz, Voicing::Piano)
    }

    /// Start a single-generator note and forget about it.
    pub fn play_note(&self, fundamental_hz: f64) -> Result<(), SynthError> {
        self.trigger(fundamental_hz, Voicing::Pure).map(|_| ())
    }

    pub fn trigger(&self, fundamental_hz: f64, voicing: Voicing) -> Result<NoteHandle, SynthError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (mut session, completion) = NoteSession::new(
            id,
            fundamental_hz,
            voicing,
            self.config.clone(),
            self.sink.clone(),
        )?;
        let runtime = Handle::try_current().map_err(|_| {
            SynthError::invalid_state("notes can only be triggered inside a tokio runtime")
        })?;

        session.start()?;
        let duration = session.total_duration();
        let (stop_tx, stop_rx) = oneshot::channel();
        runtime.spawn(drive(session, duration, stop_rx));

        Ok(NoteHandle {
            id,
            fundamental_hz,
            completion,
            stop_tx: Some(stop_tx),
        })
    }
}

/// Wait for the note timer or an early stop, then tear the session down.
async fn drive(mut session: NoteSession, duration: Duration, mut stop_rx: oneshot::Receiver<()>) {
    let id = session.id();
    tokio::select! {
        _ = tokio::time::sleep(duration) => {
            debug!("note {id}: duration elapsed");
        }
        Ok(()) = &mut stop_rx => {
            debug!("note {id}: stopped early");
        }
    }

    // Rendering on release is CPU-bound.
    match tokio::task::spawn_blocking(move || session.stop()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("note {id}: {e}"),
        Err(e) => error!("note {id}: teardown task failed: {e}"),
    }
}
