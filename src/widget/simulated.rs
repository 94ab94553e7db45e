//! Headless stand-in for the embedded video widget.
//!
//! Keeps a playback clock per loaded video and reports callbacks on an
//! unbounded channel, the way the real widget reports them to its host page.

use crate::catalog::Playlist;
use crate::timer::PlaybackTimer;
use crate::widget::{VideoWidget, WidgetErrorCode, WidgetEvent, WidgetState};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;

pub struct SimulatedWidget {
    durations: HashMap<String, f64>,
    unembeddable: HashSet<String>,
    video: Option<String>,
    clock: PlaybackTimer,
    state: WidgetState,
    volume: u8,
    muted: bool,
    events: mpsc::UnboundedSender<WidgetEvent>,
}

impl SimulatedWidget {
    /// Creates the widget and queues its `Ready` callback. Videos become
    /// playable once registered with [`register_tracks`](Self::register_tracks).
    pub fn new(events: mpsc::UnboundedSender<WidgetEvent>) -> Self {
        let widget = Self {
            durations: HashMap::new(),
            unembeddable: HashSet::new(),
            video: None,
            clock: PlaybackTimer::default(),
            state: WidgetState::Unstarted,
            volume: 100,
            muted: false,
            events,
        };
        widget.emit(WidgetEvent::Ready);
        widget
    }

    pub fn with_tracks(mut self, playlist: &Playlist) -> Self {
        self.register_tracks(playlist);
        self
    }

    /// Makes every track of `playlist` loadable with its catalog duration.
    pub fn register_tracks(&mut self, playlist: &Playlist) {
        self.durations
            .extend(playlist.iter().map(|t| (t.id.clone(), f64::from(t.duration))));
    }

    /// Marks a video as refusing embedded playback.
    pub fn with_unembeddable(mut self, id: impl Into<String>) -> Self {
        self.unembeddable.insert(id.into());
        self
    }

    fn emit(&self, event: WidgetEvent) {
        let _ = self.events.send(event);
    }

    fn transition(&mut self, state: WidgetState) {
        if self.state != state {
            self.state = state;
            self.emit(WidgetEvent::StateChange(state));
        }
    }

    fn check_video(&mut self, id: &str) -> bool {
        if self.unembeddable.contains(id) {
            self.emit(WidgetEvent::Error(WidgetErrorCode::NotEmbeddable));
            return false;
        }
        if !self.durations.contains_key(id) {
            self.emit(WidgetEvent::Error(WidgetErrorCode::NotFound));
            return false;
        }
        true
    }
}

impl VideoWidget for SimulatedWidget {
    fn load_by_id(&mut self, id: &str, start_seconds: f64) {
        self.clock.reset(start_seconds);
        self.state = WidgetState::Unstarted;
        if !self.check_video(id) {
            self.video = None;
            return;
        }
        self.video = Some(id.to_string());
        self.transition(WidgetState::Buffering);
        self.clock.mark_playing();
        self.transition(WidgetState::Playing);
    }

    fn cue_by_id(&mut self, id: &str) {
        self.clock.reset(0.0);
        if !self.check_video(id) {
            self.video = None;
            return;
        }
        self.video = Some(id.to_string());
        self.state = WidgetState::Unstarted;
        self.transition(WidgetState::Cued);
    }

    fn play(&mut self) {
        if self.video.is_none() {
            return;
        }
        if self.state == WidgetState::Ended {
            self.clock.reset(0.0);
        }
        self.clock.mark_playing();
        self.transition(WidgetState::Playing);
    }

    fn pause(&mut self) {
        if matches!(self.state, WidgetState::Playing | WidgetState::Buffering) {
            self.clock.mark_paused();
            self.transition(WidgetState::Paused);
        }
    }

    fn seek(&mut self, seconds: f64, _allow_seek_ahead: bool) {
        let target = seconds.clamp(0.0, self.duration().max(0.0));
        self.clock.set_position(target);
        if self.state == WidgetState::Ended {
            // Leaving the end without announcing it; the next play resumes here.
            self.state = WidgetState::Paused;
        }
    }

    fn current_time(&self) -> f64 {
        let duration = self.duration();
        let t = self.clock.estimate();
        if duration > 0.0 { t.min(duration) } else { t }
    }

    fn duration(&self) -> f64 {
        self.video
            .as_ref()
            .and_then(|id| self.durations.get(id))
            .copied()
            .unwrap_or(0.0)
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }

    fn mute(&mut self) {
        self.muted = true;
    }

    fn unmute(&mut self) {
        self.muted = false;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn state(&self) -> WidgetState {
        self.state
    }

    fn poll(&mut self) {
        let duration = self.duration();
        if self.state == WidgetState::Playing && duration > 0.0 && self.clock.estimate() >= duration {
            self.clock.reset(duration);
            self.transition(WidgetState::Ended);
        }
    }
}
