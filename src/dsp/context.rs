//! The per-note rendering resource.
//!
//! A context owns one note graph and the sink its audio goes to. It is
//! acquired when a note starts and released exactly once: by [`close`],
//! which renders and delivers the audio, or by drop, which discards it.
//!
//! [`close`]: RenderContext::close

use std::sync::Arc;

use log::{debug, warn};

use crate::error::SynthError;

use super::graph::NoteGraph;
use super::sink::{NoteInfo, OutputSink, RenderedNote};

pub struct RenderContext {
    info: NoteInfo,
    sample_rate: u32,
    graph: Option<NoteGraph>,
    sink: Arc<dyn OutputSink>,
}

impl RenderContext {
    pub fn acquire(
        info: NoteInfo,
        sample_rate: u32,
        graph: NoteGraph,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        debug!("note {}: render context acquired", info.id);
        RenderContext {
            info,
            sample_rate,
            graph: Some(graph),
            sink,
        }
    }

    pub fn info(&self) -> &NoteInfo {
        &self.info
    }

    pub fn graph(&self) -> Option<&NoteGraph> {
        self.graph.as_ref()
    }

    /// Stop every generator at `at` seconds of context time.
    pub fn stop_generators(&mut self, at: f64) -> Result<(), SynthError> {
        match self.graph.as_mut() {
            Some(graph) => graph.stop(at),
            None => Err(SynthError::invalid_state("render context already closed")),
        }
    }

    /// Render the graph up to `until`, hand the audio to the sink and release
    /// the graph. Returns the number of frames delivered.
    pub fn close(mut self, until: f64) -> Result<usize, SynthError> {
        let Some(mut graph) = self.graph.take() else {
            return Err(SynthError::invalid_state("render context already closed"));
        };

        if !self.sink.wants_audio() {
            graph.release();
            debug!("note {}: render context released (audio discarded)", self.info.id);
            return Ok(0);
        }

        let samples = graph.render(until);
        graph.release();
        drop(graph);

        let frames = samples.len();
        self.sink.write(RenderedNote {
            info: self.info.clone(),
            sample_rate: self.sample_rate,
            samples,
        })?;
        debug!("note {}: render context released ({frames} frames)", self.info.id);
        Ok(frames)
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        if let Some(mut graph) = self.graph.take() {
            graph.release();
            warn!("note {}: render context dropped without closing", self.info.id);
        }
    }
}
