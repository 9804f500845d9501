pub mod config;
pub mod dsp;
pub mod error;
pub mod notes;

#[cfg(feature = "runtime")]
pub mod api;
#[cfg(feature = "runtime")]
pub mod engine;
#[cfg(feature = "runtime")]
pub mod scheduler;
#[cfg(feature = "runtime")]
pub mod session;

pub use config::SynthConfig;
pub use dsp::graph::Voicing;
pub use dsp::sink::{MemorySink, NullSink, OutputSink, RenderedNote, WavDirectorySink};
pub use error::SynthError;
pub use notes::{PianoNote, PianoNotes};

#[cfg(feature = "runtime")]
pub use engine::{NoteHandle, PianoEngine};
#[cfg(feature = "runtime")]
pub use scheduler::NoteScheduler;

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn config_at(sample_rate: u32) -> Result<SynthConfig, SynthError> {
    let config = SynthConfig {
        sample_rate,
        ..SynthConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// WASM-exposed: return the crate version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: render a full piano note to mono f32 samples.
/// Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_note_samples(fundamental_hz: f64, sample_rate: u32) -> Result<Vec<f32>, JsValue> {
    let config = config_at(sample_rate).map_err(js_error)?;
    dsp::renderer::render_note(fundamental_hz, Voicing::Piano, &config).map_err(js_error)
}

/// WASM-exposed: render a full piano note to a WAV byte array.
#[wasm_bindgen]
pub fn render_note_wav(fundamental_hz: f64, sample_rate: u32) -> Result<Vec<u8>, JsValue> {
    let config = config_at(sample_rate).map_err(js_error)?;
    dsp::renderer::render_note_wav(fundamental_hz, Voicing::Piano, &config).map_err(js_error)
}

/// WASM-exposed: the partials of a fundamental as a JSON-compatible array.
#[wasm_bindgen]
pub fn harmonic_series(fundamental_hz: f64, count: usize) -> Result<JsValue, JsValue> {
    let partials = dsp::harmonics::generate(fundamental_hz, count).map_err(js_error)?;
    serde_wasm_bindgen::to_value(&partials).map_err(js_error)
}
