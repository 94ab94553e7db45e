// state.rs: Playback state owned by the controller and the snapshot handed to views

use crate::catalog::Track;
use crate::player::looper::LoopWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    Off,
    #[default]
    All,
    One,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }
}

/// Loop length as a bar subdivision label; see `looper::loop_duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LooperMode {
    #[default]
    Off,
    SixtyFourth,
    ThirtySecond,
    Sixteenth,
    Eighth,
    Quarter,
}

impl LooperMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::SixtyFourth,
            Self::SixtyFourth => Self::ThirtySecond,
            Self::ThirtySecond => Self::Sixteenth,
            Self::Sixteenth => Self::Eighth,
            Self::Eighth => Self::Quarter,
            Self::Quarter => Self::Off,
        }
    }

    pub fn denominator(self) -> Option<u32> {
        match self {
            Self::Off => None,
            Self::SixtyFourth => Some(64),
            Self::ThirtySecond => Some(32),
            Self::Sixteenth => Some(16),
            Self::Eighth => Some(8),
            Self::Quarter => Some(4),
        }
    }

    pub fn is_active(self) -> bool {
        self != Self::Off
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::SixtyFourth => "1/64",
            Self::ThirtySecond => "1/32",
            Self::Sixteenth => "1/16",
            Self::Eighth => "1/8",
            Self::Quarter => "1/4",
        }
    }
}

/// Coarse controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerPhase {
    /// No playlist loaded.
    #[default]
    Idle,
    /// Widget bound to a track, not playing yet.
    Ready,
    Playing,
    Paused,
    /// Transient; `resume` is whether playback was intended before buffering.
    Buffering { resume: bool },
    Ended,
    Error,
}

/// The single mutable playback record.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub current_index: usize,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub volume: u8,
    pub shuffle_enabled: bool,
    pub repeat_mode: RepeatMode,
    pub looper_mode: LooperMode,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_index: 0,
            is_playing: false,
            is_buffering: false,
            volume: 100,
            shuffle_enabled: false,
            repeat_mode: RepeatMode::default(),
            looper_mode: LooperMode::default(),
        }
    }
}

/// Plain copy of everything a view needs to stay in sync.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    /// Incremented on every state change.
    pub version: u64,
    pub phase: PlayerPhase,
    pub current_index: usize,
    pub track: Option<Track>,
    pub position: f64,
    pub duration: f64,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub volume: u8,
    pub muted: bool,
    pub shuffle_enabled: bool,
    pub repeat_mode: RepeatMode,
    pub looper_mode: LooperMode,
    pub loop_window: Option<LoopWindow>,
    pub auto_restart: bool,
}
