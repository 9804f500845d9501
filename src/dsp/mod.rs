//! DSP for a single note.
//!
//! Everything a note needs to sound: schedulable parameters, envelope curves,
//! oscillators, biquad filters, the harmonic model, and the graph that ties
//! them together. Rendering is offline and sample-accurate; the timing of a
//! note's life is driven from `session`.

pub mod context;
pub mod envelope;
pub mod filter;
pub mod graph;
pub mod harmonics;
pub mod mixer;
pub mod oscillator;
pub mod param;
pub mod renderer;
pub mod sink;
pub mod voice;
