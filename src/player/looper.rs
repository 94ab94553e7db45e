//! Beat-synced A/B loop ("DJ looper").
//!
//! The window is captured once when armed and never recomputed; the
//! controller polls [`Looper::check`] on a periodic task and seeks back to the
//! window start whenever the widget clock passes its end.

use crate::player::state::LooperMode;
use std::time::Duration;

pub const BPM: f64 = 120.0;
pub const BEATS_PER_BAR: f64 = 4.0;
/// How often the armed loop compares the widget clock against the window end.
pub const LOOP_CHECK_INTERVAL: Duration = Duration::from_millis(50);

pub fn bar_seconds() -> f64 {
    60.0 / BPM * BEATS_PER_BAR
}

/// Loop length in seconds for `mode`, `None` when the looper is off.
pub fn loop_duration(mode: LooperMode) -> Option<f64> {
    mode.denominator()
        .map(|denominator| bar_seconds() / f64::from(denominator) * BEATS_PER_BAR)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopWindow {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Default)]
pub struct Looper {
    mode: LooperMode,
    window: Option<LoopWindow>,
}

impl Looper {
    pub fn mode(&self) -> LooperMode {
        self.mode
    }

    /// Changes the mode and drops any armed window.
    pub fn set_mode(&mut self, mode: LooperMode) {
        self.mode = mode;
        self.window = None;
    }

    pub fn window(&self) -> Option<LoopWindow> {
        self.window
    }

    pub fn is_armed(&self) -> bool {
        self.window.is_some()
    }

    /// Captures a fresh window starting at `current_time`. Returns `None`
    /// (and stays disarmed) when the mode is off.
    pub fn arm(&mut self, current_time: f64) -> Option<LoopWindow> {
        self.window = None;
        let length = loop_duration(self.mode)?;
        let start = if current_time.is_finite() { current_time.max(0.0) } else { 0.0 };
        let window = LoopWindow { start, end: start + length };
        tracing::debug!(start = window.start, end = window.end, mode = self.mode.as_str(), "Loop armed");
        self.window = Some(window);
        Some(window)
    }

    pub fn disarm(&mut self) {
        if self.window.take().is_some() {
            tracing::debug!("Loop disarmed");
        }
    }

    /// Position to seek back to if `current_time` has passed the window end.
    pub fn check(&self, current_time: f64) -> Option<f64> {
        let window = self.window?;
        (current_time >= window.end).then_some(window.start)
    }
}
