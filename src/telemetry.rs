//! Fire-and-forget event telemetry.
//!
//! The player reports named events with a flat parameter map. Sinks must
//! never block; a missing sink is equivalent to one that drops everything.

use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};

pub trait TelemetrySink: Send + Sync {
    fn track(&self, name: &str, params: &Map<String, Value>);
}

/// Sink that writes every event to the `telemetry` tracing target.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn track(&self, name: &str, params: &Map<String, Value>) {
        let params = Value::Object(params.clone());
        tracing::info!(target: "telemetry", event = name, params = %params);
    }
}

/// Keeps every event in memory; handy for asserting on reported events.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(String, Map<String, Value>)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }
}

impl TelemetrySink for RecordingSink {
    fn track(&self, name: &str, params: &Map<String, Value>) {
        if let Ok(mut events) = self.events.lock() {
            events.push((name.to_string(), params.clone()));
        }
    }
}

/// Typed front for the player's analytics events.
#[derive(Clone, Default)]
pub struct Telemetry {
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("enabled", &self.sink.is_some())
            .finish()
    }
}

impl Telemetry {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    fn event(&self, name: &str, params: Value) {
        let Some(sink) = &self.sink else {
            return;
        };
        match params {
            Value::Object(map) => sink.track(name, &map),
            _ => sink.track(name, &Map::new()),
        }
    }

    pub fn track_play(&self, title: &str, index: usize, duration: u32) {
        self.event(
            "track_play",
            json!({
                "track_title": title,
                "track_position": index + 1,
                "track_duration": duration,
                "engagement_time_msec": 100,
            }),
        );
    }

    pub fn track_pause(&self, title: &str, current_time: f64, duration: f64) {
        let listen_percentage = if duration > 0.0 {
            (current_time / duration * 100.0).round()
        } else {
            0.0
        };
        self.event(
            "track_pause",
            json!({
                "track_title": title,
                "listen_percentage": listen_percentage as i64,
                "listen_duration": current_time.round() as i64,
            }),
        );
    }

    pub fn track_complete(&self, title: &str, duration: u32) {
        self.event(
            "track_complete",
            json!({ "track_title": title, "track_duration": duration }),
        );
    }

    pub fn track_like(&self, title: &str, liked: bool) {
        self.event(
            "track_like",
            json!({ "track_title": title, "action": if liked { "like" } else { "unlike" } }),
        );
    }

    pub fn track_share(&self, title: &str, platform: &str) {
        self.event(
            "track_share",
            json!({ "track_title": title, "share_platform": platform }),
        );
    }

    pub fn shuffle(&self, enabled: bool) {
        self.event(
            "player_shuffle",
            json!({ "action": if enabled { "on" } else { "off" } }),
        );
    }

    pub fn repeat(&self, mode: &str) {
        self.event("player_repeat", json!({ "repeat_mode": mode }));
    }

    pub fn looper(&self, mode: &str) {
        self.event(
            "player_looper",
            json!({ "looper_mode": mode, "action": if mode == "off" { "off" } else { "on" } }),
        );
    }

    pub fn volume(&self, level: u8, action: &str) {
        self.event(
            "player_volume",
            json!({ "volume_level": level, "action": action }),
        );
    }

    pub fn skip(&self, direction: &str, title: &str) {
        self.event(
            "track_skip",
            json!({ "direction": direction, "track_title": title }),
        );
    }

    pub fn playlist_load(&self, cache_hit: bool) {
        self.event(
            "playlist_load",
            json!({ "load_source": if cache_hit { "cache" } else { "api" }, "cache_hit": cache_hit }),
        );
    }

    pub fn playlist_error(&self, message: &str) {
        self.event("playlist_error", json!({ "error_message": message }));
    }
}
