//! Where a released note's rendered audio goes.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use crate::error::SynthError;

use super::graph::Voicing;
use super::renderer;

/// Identity of a rendered note.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteInfo {
    pub id: u64,
    pub fundamental_hz: f64,
    pub voicing: Voicing,
    /// Wall-clock time the note started; lets a sink line up overlapping notes.
    pub started_at: SystemTime,
}

/// Mono audio of one note, rendered from its origin.
#[derive(Debug, Clone)]
pub struct RenderedNote {
    pub info: NoteInfo,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl RenderedNote {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()))
    }
}

/// Receives rendered notes. Each session writes at most once.
pub trait OutputSink: Send + Sync {
    fn write(&self, note: RenderedNote) -> Result<(), SynthError>;

    /// Sinks that discard audio return false so rendering can be skipped.
    fn wants_audio(&self) -> bool {
        true
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write(&self, _note: RenderedNote) -> Result<(), SynthError> {
        Ok(())
    }

    fn wants_audio(&self) -> bool {
        false
    }
}

/// Keeps rendered notes in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    notes: Mutex<Vec<RenderedNote>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return everything received so far.
    pub fn take(&self) -> Vec<RenderedNote> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RenderedNote>> {
        self.notes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl OutputSink for MemorySink {
    fn write(&self, note: RenderedNote) -> Result<(), SynthError> {
        self.lock().push(note);
        Ok(())
    }
}

/// Writes each note as a 16-bit mono WAV file into a directory.
#[derive(Debug, Clone)]
pub struct WavDirectorySink {
    dir: PathBuf,
}

impl WavDirectorySink {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, SynthError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(WavDirectorySink { dir })
    }

    pub fn path_for(&self, info: &NoteInfo) -> PathBuf {
        self.dir.join(format!(
            "{:03}-{}-{:.2}hz.wav",
            info.id, info.voicing, info.fundamental_hz
        ))
    }
}

impl OutputSink for WavDirectorySink {
    fn write(&self, note: RenderedNote) -> Result<(), SynthError> {
        let path = self.path_for(&note.info);
        renderer::write_wav(&path, &note.samples, note.sample_rate)?;
        log::info!("wrote {:.2}s note to {}", note.duration_secs(), path.display());
        Ok(())
    }
}
