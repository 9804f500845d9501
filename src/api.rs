//! Route handling for the note service, independent of any HTTP server.
//!
//! | Route            | Behaviour                                         |
//! |------------------|---------------------------------------------------|
//! | `GET /`          | service info                                      |
//! | `GET /health`    | liveness and uptime                               |
//! | `GET /play`      | triggers the demo sequence                        |
//! | `POST /playnote` | `{ "note": "C" }` plays C4..B4 and waits for it   |
//!
//! Anything else is a 404. Timestamps are ISO-8601 UTC with milliseconds.

use std::future::Future;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use log::{debug, error, info};
use serde::Serialize;
use serde_json::{Value, json};

use crate::engine::PianoEngine;
use crate::error::SynthError;
use crate::notes::PianoNote;
use crate::scheduler::NoteScheduler;

/// What the routes need from the synthesis side.
pub trait NotePlayer: Send + Sync {
    /// Play a note and wait until it has been released.
    fn play(&self, fundamental_hz: f64) -> impl Future<Output = Result<(), SynthError>> + Send;

    /// Trigger a sequence, returning once every note has been triggered.
    fn play_sequence(
        &self,
        sequence: &NoteScheduler,
    ) -> impl Future<Output = Result<usize, SynthError>> + Send;
}

impl NotePlayer for PianoEngine {
    fn play(&self, fundamental_hz: f64) -> impl Future<Output = Result<(), SynthError>> + Send {
        async move {
            self.create_note(fundamental_hz)?.await;
            Ok(())
        }
    }

    fn play_sequence(
        &self,
        sequence: &NoteScheduler,
    ) -> impl Future<Output = Result<usize, SynthError>> + Send {
        async move { sequence.run(self).await.map(|handles| handles.len()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Other,
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            _ => Method::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        ApiRequest {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        ApiRequest {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        ApiResponse { status: 200, body }
    }

    fn error(status: u16, error: &str, message: impl Into<String>) -> Self {
        ApiResponse {
            status,
            body: json!({ "error": error, "message": message.into() }),
        }
    }
}

fn timestamp() -> String {
    format_timestamp(SystemTime::now())
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`. Times before the epoch format as the epoch.
pub fn format_timestamp(time: SystemTime) -> String {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = since_epoch.as_secs();
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    let rem = secs % 86_400;
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{:03}Z",
        rem / 3600,
        rem % 3600 / 60,
        rem % 60,
        since_epoch.subsec_millis()
    )
}

// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

pub struct Api<P> {
    player: P,
    started: Instant,
}

impl<P: NotePlayer> Api<P> {
    pub fn new(player: P) -> Self {
        Api {
            player,
            started: Instant::now(),
        }
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub async fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let route = request.path.split('?').next().unwrap_or_default();
        debug!("{:?} {}", request.method, request.path);

        match (request.method, route) {
            (Method::Get, "/") => self.index(),
            (Method::Get, "/health") => self.health(),
            (Method::Get, "/play") => self.play_demo().await,
            (Method::Post, "/playnote") => self.play_note(request.body.as_ref()).await,
            _ => ApiResponse {
                status: 404,
                body: json!({ "error": "Route not found", "path": request.path }),
            },
        }
    }

    fn index(&self) -> ApiResponse {
        ApiResponse::ok(json!({
            "message": "Ready to play music!",
            "timestamp": timestamp(),
            "version": crate::VERSION,
        }))
    }

    fn health(&self) -> ApiResponse {
        ApiResponse::ok(json!({
            "status": "healthy",
            "uptime": self.started.elapsed().as_secs_f64(),
            "timestamp": timestamp(),
        }))
    }

    async fn play_demo(&self) -> ApiResponse {
        match self.player.play_sequence(&NoteScheduler::demo()).await {
            Ok(count) => ApiResponse::ok(json!({
                "message": "Sequence started",
                "notes": count,
                "timestamp": timestamp(),
            })),
            Err(e) => {
                error!("Error playing sequence: {e}");
                ApiResponse::error(500, "Failed to play sequence", e.to_string())
            }
        }
    }

    async fn play_note(&self, body: Option<&Value>) -> ApiResponse {
        let note = match body.and_then(|b| b.get("note")).and_then(Value::as_str) {
            Some(note) if !note.is_empty() => note,
            _ => {
                return ApiResponse::error(
                    400,
                    "Invalid payload",
                    "Note parameter is required and must be a string",
                );
            }
        };

        let Some(piano_note) = PianoNote::from_letter(note) else {
            return ApiResponse::ok(json!({
                "message": "Note received but not played",
                "note": note,
                "timestamp": timestamp(),
            }));
        };

        info!("Play note requested: {note} ({piano_note})");
        match self.player.play(piano_note.frequency()).await {
            Ok(()) => ApiResponse::ok(json!({
                "message": format!("Piano note {note} played successfully"),
                "note": note,
                "timestamp": timestamp(),
            })),
            Err(e) => {
                error!("Error playing note: {e}");
                ApiResponse::error(500, "Failed to play note", e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records calls instead of synthesizing.
    #[derive(Default)]
    struct RecordingPlayer {
        played: Mutex<Vec<f64>>,
        fail: bool,
    }

    impl RecordingPlayer {
        fn played(&self) -> Vec<f64> {
            self.played.lock().unwrap().clone()
        }
    }

    impl NotePlayer for RecordingPlayer {
        fn play(&self, fundamental_hz: f64) -> impl Future<Output = Result<(), SynthError>> + Send {
            async move {
                if self.fail {
                    return Err(SynthError::invalid_state("output device gone"));
                }
                self.played.lock().unwrap().push(fundamental_hz);
                Ok(())
            }
        }

        fn play_sequence(
            &self,
            sequence: &NoteScheduler,
        ) -> impl Future<Output = Result<usize, SynthError>> + Send {
            let hz: Vec<f64> = sequence.steps().iter().map(|s| s.fundamental_hz).collect();
            async move {
                self.played.lock().unwrap().extend(hz.iter().copied());
                Ok(hz.len())
            }
        }
    }

    fn api() -> Api<RecordingPlayer> {
        Api::new(RecordingPlayer::default())
    }

    #[test]
    fn timestamps_are_iso_8601() {
        use std::time::Duration;
        assert_eq!(format_timestamp(UNIX_EPOCH), "1970-01-01T00:00:00.000Z");
        let t = UNIX_EPOCH + Duration::from_millis(951_782_400_123);
        assert_eq!(format_timestamp(t), "2000-02-29T00:00:00.123Z");
        let t = UNIX_EPOCH + Duration::from_secs(1_792_454_399);
        assert_eq!(format_timestamp(t), "2026-10-19T23:59:59.000Z");
    }

    #[tokio::test]
    async fn index_and_health() {
        let api = api();
        let index = api.handle(&ApiRequest::get("/")).await;
        assert_eq!(index.status, 200);
        assert_eq!(index.body["message"], "Ready to play music!");
        assert_eq!(index.body["version"], crate::VERSION);
        let ts = index.body["timestamp"].as_str().unwrap();
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));

        let health = api.handle(&ApiRequest::get("/health")).await;
        assert_eq!(health.status, 200);
        assert_eq!(health.body["status"], "healthy");
        assert!(health.body["uptime"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn play_triggers_demo_sequence() {
        let api = api();
        let resp = api.handle(&ApiRequest::get("/play")).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["notes"], 3);
        assert_eq!(api.player().played(), vec![440.0, 329.63, 261.63]);
    }

    #[tokio::test]
    async fn playnote_plays_mapped_letters() {
        let api = api();
        let resp = api
            .handle(&ApiRequest::post("/playnote", json!({ "note": "A" })))
            .await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["message"], "Piano note A played successfully");
        assert_eq!(resp.body["note"], "A");
        assert_eq!(api.player().played(), vec![440.0]);
    }

    #[tokio::test]
    async fn playnote_ignores_unknown_symbols() {
        let api = api();
        let resp = api
            .handle(&ApiRequest::post("/playnote", json!({ "note": "Z" })))
            .await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["message"], "Note received but not played");
        assert!(api.player().played().is_empty());
    }

    #[tokio::test]
    async fn playnote_rejects_bad_payloads() {
        let api = api();
        for body in [json!({}), json!({ "note": 5 }), json!({ "note": "" })] {
            let resp = api.handle(&ApiRequest::post("/playnote", body)).await;
            assert_eq!(resp.status, 400);
            assert_eq!(resp.body["error"], "Invalid payload");
        }
        let no_body = ApiRequest {
            method: Method::Post,
            path: "/playnote".into(),
            body: None,
        };
        assert_eq!(api.handle(&no_body).await.status, 400);
        assert!(api.player().played().is_empty());
    }

    #[tokio::test]
    async fn engine_failure_is_a_500() {
        let api = Api::new(RecordingPlayer {
            fail: true,
            ..RecordingPlayer::default()
        });
        let resp = api
            .handle(&ApiRequest::post("/playnote", json!({ "note": "C" })))
            .await;
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body["error"], "Failed to play note");
        assert!(resp.body["message"].as_str().unwrap().contains("output device gone"));
    }

    #[tokio::test]
    async fn unknown_routes_are_404() {
        let api = api();
        let resp = api.handle(&ApiRequest::get("/nope?x=1")).await;
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body["path"], "/nope?x=1");

        let wrong_method = api.handle(&ApiRequest::get("/playnote")).await;
        assert_eq!(wrong_method.status, 404);
        assert_eq!(Method::parse("delete"), Method::Delete);
    }
}
