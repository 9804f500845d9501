use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use log::info;

use piano_synth::api::{Api, ApiRequest, Method};
use piano_synth::notes::note_to_frequency;
use piano_synth::{NoteScheduler, NullSink, OutputSink, PianoEngine, SynthConfig, WavDirectorySink};

const USAGE: &str = "\
usage: piano [--config FILE] [--out DIR] [--gap MS] [NOTE...]
       piano [--config FILE] [--out DIR] route METHOD PATH [JSON]

Plays the demo sequence (A4, E4, C4) when no notes are given.
NOTE is a name like C4, F#3 or Bb5.";

struct Args {
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    gap: Duration,
    notes: Vec<String>,
    route: Option<(String, String, Option<String>)>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        out: None,
        gap: Duration::from_millis(500),
        notes: Vec::new(),
        route: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            "--config" => {
                args.config = Some(iter.next().context("--config needs a file")?.into());
            }
            "--out" => {
                args.out = Some(iter.next().context("--out needs a directory")?.into());
            }
            "--gap" => {
                let ms: u64 = iter
                    .next()
                    .context("--gap needs milliseconds")?
                    .parse()
                    .context("--gap must be an integer")?;
                args.gap = Duration::from_millis(ms);
            }
            "route" => {
                let method = iter.next().context("route needs a METHOD")?;
                let path = iter.next().context("route needs a PATH")?;
                args.route = Some((method, path, iter.next()));
            }
            flag if flag.starts_with('-') => bail!("unknown option '{flag}'\n\n{USAGE}"),
            note => args.notes.push(note.to_string()),
        }
    }
    Ok(args)
}

fn build_sequence(notes: &[String], gap: Duration) -> Result<NoteScheduler> {
    if notes.is_empty() {
        return Ok(NoteScheduler::demo());
    }
    let mut sequence = NoteScheduler::new();
    for (i, name) in notes.iter().enumerate() {
        let hz = note_to_frequency(name).ok_or_else(|| anyhow!("unknown note '{name}'"))?;
        let delay = if i + 1 < notes.len() { gap } else { Duration::ZERO };
        sequence = sequence.then(hz, delay);
    }
    Ok(sequence)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => SynthConfig::load(path)?,
        None => SynthConfig::default(),
    };
    let sink: Arc<dyn OutputSink> = match &args.out {
        Some(dir) => Arc::new(WavDirectorySink::create(dir)?),
        None => Arc::new(NullSink),
    };
    let engine = PianoEngine::new(config, sink)?;

    if let Some((method, path, body)) = args.route {
        let body = body
            .map(|b| serde_json::from_str(&b))
            .transpose()
            .context("request body must be JSON")?;
        let request = ApiRequest {
            method: Method::parse(&method),
            path,
            body,
        };
        let response = Api::new(engine).handle(&request).await;
        println!("{} {}", response.status, response.body);
        return Ok(());
    }

    let sequence = build_sequence(&args.notes, args.gap)?;
    info!("Starting piano sequence...");
    let handles = sequence.run(&engine).await?;
    for handle in handles {
        handle.await;
    }
    info!("Sequence complete!");
    Ok(())
}
