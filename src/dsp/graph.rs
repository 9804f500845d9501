//! Note graph — partial voices → filter chain → master gain → destination.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SynthConfig;
use crate::error::SynthError;

use super::envelope::EnvelopeCurve;
use super::filter::FilterChain;
use super::harmonics::{HarmonicSeriesModel, Partial, validate_fundamental};
use super::mixer::{Mixer, to_destination};
use super::param::AudioParam;
use super::voice::PartialVoice;

/// Frames rendered per block.
const BLOCK_SIZE: usize = 128;

/// How a note is voiced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voicing {
    /// Full harmonic series through the filter chain.
    Piano,
    /// One generator with only the master envelope.
    Pure,
}

impl fmt::Display for Voicing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Voicing::Piano => write!(f, "piano"),
            Voicing::Pure => write!(f, "pure"),
        }
    }
}

/// A validated description of one note. Building a plan performs every
/// argument check, so a graph built from it cannot fail on bad input.
#[derive(Debug, Clone)]
pub struct NotePlan {
    pub fundamental_hz: f64,
    pub voicing: Voicing,
    pub partials: Vec<Partial>,
}

impl NotePlan {
    pub fn new(
        fundamental_hz: f64,
        voicing: Voicing,
        config: &SynthConfig,
    ) -> Result<Self, SynthError> {
        validate_fundamental(fundamental_hz)?;
        config.validate()?;

        let partials = match voicing {
            Voicing::Piano => HarmonicSeriesModel::new(config.harmonics.clone())?
                .generate(fundamental_hz, config.harmonic_count)?,
            Voicing::Pure => vec![Partial {
                frequency_hz: fundamental_hz,
                amplitude_ratio: 1.0,
                detune_cents: 0.0,
            }],
        };

        Ok(NotePlan {
            fundamental_hz,
            voicing,
            partials,
        })
    }
}

/// The full signal graph of one note.
#[derive(Debug)]
pub struct NoteGraph {
    voices: Vec<PartialVoice>,
    filter: Option<FilterChain>,
    master: AudioParam,
    master_curve: EnvelopeCurve,
    mixer: Mixer,
    output_gain: f64,
    sample_rate: f64,
    origin: Option<f64>,
}

impl NoteGraph {
    pub fn build(plan: &NotePlan, config: &SynthConfig) -> Result<Self, SynthError> {
        let sample_rate = config.sample_rate as f64;

        let (voices, filter) = match plan.voicing {
            Voicing::Piano => {
                let voices = plan
                    .partials
                    .iter()
                    .enumerate()
                    .map(|(i, p)| PartialVoice::create(*p, config.global_scale, i, &config.decay))
                    .collect::<Result<Vec<_>, _>>()?;
                let filter = FilterChain::create(&config.filter, sample_rate)?;
                (voices, Some(filter))
            }
            Voicing::Pure => {
                let voice = PartialVoice::sustained(
                    plan.partials[0],
                    config.global_scale,
                    config.pure_waveform,
                )?;
                (vec![voice], None)
            }
        };

        Ok(NoteGraph {
            voices,
            filter,
            master: AudioParam::new(0.0),
            master_curve: config.master_curve()?,
            mixer: Mixer::new(),
            output_gain: config.output_gain,
            sample_rate,
            origin: None,
        })
    }

    pub fn voices(&self) -> &[PartialVoice] {
        &self.voices
    }

    pub fn filter(&self) -> Option<&FilterChain> {
        self.filter.as_ref()
    }

    pub fn master(&self) -> &AudioParam {
        &self.master
    }

    pub fn origin(&self) -> Option<f64> {
        self.origin
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Schedule every envelope and filter movement relative to `origin` and
    /// start all generators there.
    pub fn start(&mut self, origin: f64) -> Result<(), SynthError> {
        if self.origin.is_some() {
            return Err(SynthError::invalid_state("note graph already started"));
        }
        self.master_curve.schedule_onto(&mut self.master, origin);
        if let Some(filter) = self.filter.as_mut() {
            filter.schedule(origin);
        }
        for voice in &mut self.voices {
            voice.start(origin)?;
        }
        self.origin = Some(origin);
        Ok(())
    }

    /// Halt every generator at `at`.
    pub fn stop(&mut self, at: f64) -> Result<(), SynthError> {
        for voice in &mut self.voices {
            voice.stop(at)?;
        }
        Ok(())
    }

    /// Render from the origin until `until` seconds of context time.
    pub fn render(&mut self, until: f64) -> Vec<f32> {
        let origin = self.origin.unwrap_or(0.0);
        let total = ((until - origin).max(0.0) * self.sample_rate).round() as usize;
        let mut out = Vec::with_capacity(total);

        let mut frame = 0;
        while frame < total {
            let block = BLOCK_SIZE.min(total - frame);
            let time_of = |i: usize| origin + (frame + i) as f64 / self.sample_rate;

            self.mixer.clear(block);
            for voice in &mut self.voices {
                voice.render_into(self.mixer.samples_mut(), time_of(0), self.sample_rate);
            }

            for (i, &sum) in self.mixer.samples().iter().enumerate() {
                let t = time_of(i);
                let shaped = match self.filter.as_mut() {
                    Some(filter) => filter.process(sum, t),
                    None => sum,
                };
                out.push(to_destination(shaped * self.master.value_at(t) * self.output_gain));
            }
            frame += block;
        }
        out
    }

    /// Drop filter state and automation.
    pub fn release(&mut self) {
        if let Some(filter) = self.filter.as_mut() {
            filter.release();
        }
        self.master.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SynthConfig {
        SynthConfig {
            sample_rate: 8000,
            ..SynthConfig::default()
        }
    }

    fn started_graph(hz: f64, voicing: Voicing) -> NoteGraph {
        let config = test_config();
        let plan = NotePlan::new(hz, voicing, &config).unwrap();
        let mut graph = NoteGraph::build(&plan, &config).unwrap();
        graph.start(0.0).unwrap();
        graph
    }

    #[test]
    fn plan_rejects_bad_fundamental() {
        let config = test_config();
        assert!(NotePlan::new(0.0, Voicing::Piano, &config).unwrap_err().is_invalid_argument());
        assert!(NotePlan::new(-1.0, Voicing::Pure, &config).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn piano_graph_has_one_voice_per_harmonic() {
        let graph = started_graph(440.0, Voicing::Piano);
        assert_eq!(graph.voices().len(), 8);
        assert!(graph.filter().is_some());
        assert_eq!(graph.origin(), Some(0.0));
        assert_eq!(graph.sample_rate(), 8000.0);
        for voice in graph.voices() {
            assert_eq!(voice.oscillator().start_time(), Some(0.0));
        }
    }

    #[test]
    fn pure_graph_is_a_single_generator() {
        let graph = started_graph(440.0, Voicing::Pure);
        assert_eq!(graph.voices().len(), 1);
        assert!(graph.filter().is_none());
    }

    #[test]
    fn master_envelope_shapes_output() {
        let graph = started_graph(440.0, Voicing::Piano);
        assert_eq!(graph.master().value_at(0.0), 0.0);
        assert!((graph.master().value_at(0.005) - 1.0).abs() < 1e-12);
        assert!((graph.master().value_at(3.0) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn render_length_and_range() {
        let mut graph = started_graph(261.63, Voicing::Piano);
        let samples = graph.render(1.0);
        assert_eq!(samples.len(), 8000);
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
        assert!(samples.iter().any(|s| s.abs() > 0.01), "note should be audible");
    }

    #[test]
    fn note_decays_over_its_life() {
        let mut graph = started_graph(440.0, Voicing::Piano);
        let samples = graph.render(7.0);
        let rms = |from: f64, to: f64| {
            let a = (from * 8000.0) as usize;
            let b = (to * 8000.0) as usize;
            let sum: f64 = samples[a..b].iter().map(|&s| (s as f64) * (s as f64)).sum();
            (sum / (b - a) as f64).sqrt()
        };
        assert!(rms(0.1, 0.6) > rms(2.0, 2.5));
        assert!(rms(2.0, 2.5) > rms(6.0, 6.5));
    }

    #[test]
    fn start_twice_is_invalid_state() {
        let mut graph = started_graph(440.0, Voicing::Pure);
        assert!(graph.start(0.0).unwrap_err().is_invalid_state());
    }
}
