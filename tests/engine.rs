use std::sync::Arc;
use std::time::Duration;

use piano_synth::api::{Api, ApiRequest};
use piano_synth::{MemorySink, NoteScheduler, PianoEngine, PianoNotes, SynthConfig, Voicing};
use serde_json::json;
use tokio::time::Instant;

fn engine(sink: Arc<MemorySink>) -> PianoEngine {
    let config = SynthConfig {
        sample_rate: 8000,
        ..SynthConfig::default()
    };
    PianoEngine::new(config, sink).unwrap()
}

#[tokio::test(start_paused = true)]
async fn overlapping_notes_render_from_their_own_origin() {
    let sink = Arc::new(MemorySink::new());
    let engine = engine(sink.clone());

    let first = engine.create_note(PianoNotes::A4).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let second = engine.create_note(PianoNotes::E4).unwrap();
    first.await;
    second.await;

    let mut notes = sink.take();
    notes.sort_by_key(|n| n.info.id);
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].info.fundamental_hz, PianoNotes::A4);
    assert_eq!(notes[1].info.fundamental_hz, PianoNotes::E4);
    assert!(notes[0].info.started_at <= notes[1].info.started_at);
    for note in &notes {
        assert_eq!(note.samples.len(), 8000 * 7);
        // Attack starts from silence at each note's own origin.
        assert!(note.samples[0].abs() < 1e-3);
        assert!(note.peak() > 0.01);
    }
}

#[tokio::test(start_paused = true)]
async fn same_fundamental_renders_identically() {
    let sink = Arc::new(MemorySink::new());
    let engine = engine(sink.clone());

    let a = engine.create_note(PianoNotes::C4).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let b = engine.create_note(PianoNotes::C4).unwrap();
    a.await;
    b.await;

    let notes = sink.take();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].samples, notes[1].samples);
}

#[tokio::test(start_paused = true)]
async fn piano_note_resolves_at_seven_seconds() {
    let sink = Arc::new(MemorySink::new());
    let engine = engine(sink.clone());

    let start = Instant::now();
    let mut handle = engine.create_note(PianoNotes::A4).unwrap();
    tokio::time::sleep(Duration::from_millis(6900)).await;
    assert!(!handle.is_finished());
    handle.await;
    assert!(start.elapsed() >= Duration::from_secs(7));

    let notes = sink.take();
    assert_eq!(notes[0].info.voicing, Voicing::Piano);
}

#[tokio::test(start_paused = true)]
async fn demo_sequence_triggers_three_notes() {
    let sink = Arc::new(MemorySink::new());
    let engine = engine(sink.clone());

    let handles = NoteScheduler::demo().run(&engine).await.unwrap();
    let ids: Vec<u64> = handles.iter().map(|h| h.id()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    for handle in handles {
        handle.await;
    }
    assert_eq!(sink.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn playnote_route_drives_the_engine() {
    let sink = Arc::new(MemorySink::new());
    let api = Api::new(engine(sink.clone()));

    let resp = api
        .handle(&ApiRequest::post("/playnote", json!({ "note": "G" })))
        .await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["message"], "Piano note G played successfully");
    let notes = sink.take();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].info.fundamental_hz, PianoNotes::G4);

    let ignored = api
        .handle(&ApiRequest::post("/playnote", json!({ "note": "Z" })))
        .await;
    assert_eq!(ignored.status, 200);
    assert_eq!(ignored.body["message"], "Note received but not played");
    assert!(sink.is_empty());
}
