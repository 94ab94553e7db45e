//! Command/event surface of the embedded video widget.
//!
//! The widget is owned by a third party; the player only issues the commands
//! below and reacts to the callbacks it emits.

pub mod simulated;

pub use simulated::SimulatedWidget;

/// Playback state reported by the widget's state-change callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl WidgetState {
    /// Decode the numeric state codes used by the iframe API.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }
}

/// Error codes delivered through the widget's error callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetErrorCode {
    InvalidParameter,
    Html5,
    NotFound,
    NotEmbeddable,
    Other(i32),
}

impl WidgetErrorCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            2 => Self::InvalidParameter,
            5 => Self::Html5,
            100 => Self::NotFound,
            101 | 150 => Self::NotEmbeddable,
            other => Self::Other(other),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::InvalidParameter => "Invalid video parameter",
            Self::Html5 => "HTML5 player error",
            Self::NotFound => "Video not found",
            Self::NotEmbeddable => "Video not allowed to be embedded",
            Self::Other(_) => "Unknown playback error",
        }
    }

    /// Errors that may clear up by reloading the same video.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::InvalidParameter | Self::Html5)
    }
}

/// Callbacks emitted by the widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WidgetEvent {
    Ready,
    StateChange(WidgetState),
    Error(WidgetErrorCode),
}

/// Commands the player may issue to the widget.
pub trait VideoWidget {
    /// Load a video and start playing it from `start_seconds`.
    fn load_by_id(&mut self, id: &str, start_seconds: f64);
    /// Load a video without starting playback.
    fn cue_by_id(&mut self, id: &str);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64, allow_seek_ahead: bool);
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn volume(&self) -> u8;
    fn set_volume(&mut self, volume: u8);
    fn mute(&mut self);
    fn unmute(&mut self);
    fn is_muted(&self) -> bool;
    fn state(&self) -> WidgetState;

    /// Gives widgets without their own event source a chance to emit
    /// pending callbacks (e.g. end of track). Default is a no-op.
    fn poll(&mut self) {}
}
