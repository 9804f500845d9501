//! Offline renderer — a whole note to samples or WAV, without timers.

use std::io::Cursor;
use std::path::Path;

use crate::config::SynthConfig;
use crate::error::SynthError;

use super::graph::{NoteGraph, NotePlan, Voicing};

/// Render one note for the configured note duration.
pub fn render_note(
    fundamental_hz: f64,
    voicing: Voicing,
    config: &SynthConfig,
) -> Result<Vec<f32>, SynthError> {
    let plan = NotePlan::new(fundamental_hz, voicing, config)?;
    let mut graph = NoteGraph::build(&plan, config)?;
    graph.start(0.0)?;
    graph.stop(config.note_duration_secs)?;
    Ok(graph.render(config.note_duration_secs))
}

/// Render one note to WAV bytes (16-bit mono PCM).
pub fn render_note_wav(
    fundamental_hz: f64,
    voicing: Voicing,
    config: &SynthConfig,
) -> Result<Vec<u8>, SynthError> {
    let samples = render_note(fundamental_hz, voicing, config)?;
    encode_wav(&samples, config.sample_rate)
}

fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Encode mono samples to a WAV byte buffer.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, SynthError> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, wav_spec(sample_rate))?;
        for &s in samples {
            writer.write_sample(to_i16(s))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Write mono samples to a WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), SynthError> {
    let mut writer = hound::WavWriter::create(path, wav_spec(sample_rate))?;
    for &s in samples {
        writer.write_sample(to_i16(s))?;
    }
    writer.finalize()?;
    Ok(())
}
