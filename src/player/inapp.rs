//! Autoplay recovery for restrictive in-app browsers.
//!
//! Social-app webviews refuse unmuted autoplay and pause background media on
//! their own. Playback there starts muted, and unexpected pauses are answered
//! with a bounded number of restarts.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

pub const MAX_RESTART_ATTEMPTS: u32 = 5;
pub const RESTART_DELAY: Duration = Duration::from_millis(200);
pub const LOAD_DELAY: Duration = Duration::from_millis(100);
pub const PLAY_DELAY: Duration = Duration::from_millis(600);
pub const VERIFY_DELAY: Duration = Duration::from_millis(1500);
pub const UNMUTE_CHECK_DELAY: Duration = Duration::from_millis(300);

static IN_APP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Instagram|FBAN|FBAV|Twitter|LinkedIn").expect("valid in-app regex"));

/// True when `user_agent` identifies a restrictive in-app browser.
pub fn is_in_app_browser(user_agent: &str) -> bool {
    IN_APP_RE.is_match(user_agent)
}

/// Outcome of an unexpected pause while auto-restart is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    Retry { attempt: u32 },
    GiveUp,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InAppRecovery {
    detected: bool,
    auto_restart: bool,
    attempts: u32,
}

impl InAppRecovery {
    pub fn detect(user_agent: &str) -> Self {
        let detected = is_in_app_browser(user_agent);
        if detected {
            tracing::info!(user_agent, "Restrictive in-app browser detected");
        }
        Self { detected, ..Self::default() }
    }

    pub fn is_in_app(&self) -> bool {
        self.detected
    }

    pub fn auto_restart(&self) -> bool {
        self.auto_restart
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn enable(&mut self) {
        self.auto_restart = true;
        self.attempts = 0;
    }

    pub fn disable(&mut self) {
        self.auto_restart = false;
    }

    /// Playback resumed; the next interruption starts a fresh budget.
    pub fn on_playing(&mut self) {
        self.attempts = 0;
    }

    /// Consumes one restart attempt, disabling auto-restart once the budget
    /// is spent. `None` when auto-restart is off.
    pub fn on_unexpected_pause(&mut self) -> Option<RestartDecision> {
        if !self.auto_restart {
            return None;
        }
        if self.attempts >= MAX_RESTART_ATTEMPTS {
            self.auto_restart = false;
            tracing::warn!(attempts = self.attempts, "Auto-restart limit reached");
            return Some(RestartDecision::GiveUp);
        }
        self.attempts += 1;
        Some(RestartDecision::Retry { attempt: self.attempts })
    }
}
