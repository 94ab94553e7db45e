//! The playback controller: owns the playlist, the single [`PlaybackState`]
//! and the widget handle, and turns user intents and widget callbacks into
//! widget commands, scheduled tasks and [`ViewUpdate`]s.
//!
//! Everything here is synchronous. Delays are entries in the controller's
//! [`Scheduler`]; the event loop calls [`PlayerController::run_due_tasks`]
//! whenever the next deadline passes.

use crate::catalog::types::watch_url;
use crate::catalog::{CatalogSource, LoadError, LoadSource, Playlist, PlaylistLoader, Track};
use crate::likes::LikedSet;
use crate::player::fade::Fade;
use crate::player::inapp::{self, InAppRecovery, RestartDecision};
use crate::player::looper::{LOOP_CHECK_INTERVAL, Looper};
use crate::player::schedule::{Scheduler, Task, TaskGroup};
use crate::player::shuffle::ShuffleSequencer;
use crate::player::state::{LooperMode, PlaybackState, PlayerPhase, PlayerSnapshot, RepeatMode};
use crate::share::{SharePlatform, share_url};
use crate::store::SharedStore;
use crate::telemetry::Telemetry;
use crate::view::{ViewSender, ViewUpdate};
use crate::widget::{VideoWidget, WidgetErrorCode, WidgetEvent, WidgetState};
use std::time::Duration;
use tokio::time::Instant;

pub const VOLUME_KEY: &str = "playerVolume";
pub const DEFAULT_VOLUME: u8 = 100;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);
const FADE_OUT: Duration = Duration::from_millis(300);
const SWAP_DELAY: Duration = Duration::from_millis(350);
const FADE_IN: Duration = Duration::from_millis(400);
const FADE_IN_DELAY: Duration = Duration::from_millis(200);
const PLAY_DELAY: Duration = Duration::from_millis(100);
const IN_APP_PLAY_DELAY: Duration = Duration::from_millis(400);
const OPEN_EXTERNAL_DELAY: Duration = Duration::from_millis(500);
const UNEMBEDDABLE_SKIP_DELAY: Duration = Duration::from_millis(1500);
const ERROR_SKIP_DELAY: Duration = Duration::from_millis(1000);
const ERROR_RELOAD_DELAY: Duration = Duration::from_millis(1000);
const NOTIFY_DEFAULT: Duration = Duration::from_millis(2000);
const SEEK_STEP: f64 = 5.0;
const VOLUME_STEP: i16 = 10;

/// Runtime knobs that are not part of the playback state.
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    /// Identifying string of the embedding host, checked for restrictive
    /// in-app browsers.
    pub user_agent: String,
    /// Open tracks that refuse embedding on their public page before skipping.
    pub open_unembeddable_externally: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            open_unembeddable_externally: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Next,
    Previous,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
        }
    }
}

pub struct PlayerController<W: VideoWidget> {
    widget: W,
    widget_ready: bool,
    playlist: Playlist,
    state: PlaybackState,
    phase: PlayerPhase,
    version: u64,
    shuffle: ShuffleSequencer,
    looper: Looper,
    fade: Option<Fade>,
    scheduler: Scheduler,
    recovery: InAppRecovery,
    likes: LikedSet,
    /// Restored by unmute; only non-zero volumes land here.
    last_audible_volume: u8,
    /// Set when the controller itself pauses, so the resulting callback is
    /// not mistaken for host interference.
    expect_pause: bool,
    /// Playing state captured when a scrub started.
    scrub: Option<bool>,
    /// Track that already had its one reload after a transient error.
    retried_index: Option<usize>,
    external_button_shown: bool,
    store: SharedStore,
    telemetry: Telemetry,
    view: ViewSender,
    settings: PlayerSettings,
}

impl<W: VideoWidget> PlayerController<W> {
    pub fn new(widget: W, store: SharedStore, telemetry: Telemetry, view: ViewSender, settings: PlayerSettings) -> Self {
        let saved = load_saved_volume(&store);
        let state = PlaybackState {
            volume: saved.unwrap_or(DEFAULT_VOLUME),
            ..PlaybackState::default()
        };
        let recovery = InAppRecovery::detect(&settings.user_agent);
        let likes = LikedSet::load(&store);
        Self {
            widget,
            widget_ready: false,
            playlist: Vec::new(),
            state,
            phase: PlayerPhase::Idle,
            version: 0,
            shuffle: ShuffleSequencer::new(),
            looper: Looper::default(),
            fade: None,
            scheduler: Scheduler::default(),
            recovery,
            likes,
            last_audible_volume: saved.unwrap_or(DEFAULT_VOLUME),
            expect_pause: false,
            scrub: None,
            retried_index: None,
            external_button_shown: false,
            store,
            telemetry,
            view,
            settings,
        }
    }

    /// Replaces the shuffle sequencer, e.g. with a seeded one.
    pub fn with_shuffle(mut self, shuffle: ShuffleSequencer) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    pub fn is_in_app(&self) -> bool {
        self.recovery.is_in_app()
    }

    pub fn likes(&self) -> &LikedSet {
        &self.likes
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_due()
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.scheduler.is_empty()
    }

    fn is_ready(&self) -> bool {
        self.widget_ready && !self.playlist.is_empty()
    }

    fn current_track(&self) -> Option<&Track> {
        self.playlist.get(self.state.current_index)
    }

    fn emit(&mut self, update: ViewUpdate) {
        self.version += 1;
        let _ = self.view.send(update);
    }

    fn notify(&mut self, message: impl Into<String>, dismiss_after: Option<Duration>) {
        self.scheduler.cancel_group(TaskGroup::Notification);
        if let Some(after) = dismiss_after {
            self.scheduler.schedule(TaskGroup::Notification, after, Task::DismissNotification);
        }
        self.emit(ViewUpdate::Notification {
            message: message.into(),
            dismiss_after,
        });
    }

    fn emit_play_state(&mut self) {
        self.emit(ViewUpdate::PlayState {
            playing: self.state.is_playing,
            buffering: self.state.is_buffering,
        });
    }

    fn emit_modes(&mut self) {
        self.emit(ViewUpdate::Modes {
            shuffle: self.state.shuffle_enabled,
            repeat: self.state.repeat_mode,
            looper: self.state.looper_mode,
        });
    }

    fn render_now_playing(&mut self) {
        let Some(track) = self.current_track().cloned() else {
            return;
        };
        let liked = self.likes.contains(&track.id);
        self.emit(ViewUpdate::NowPlaying {
            index: self.state.current_index,
            track,
            liked,
        });
    }

    // ---- loading ----

    /// Cache-first playlist load followed by [`attach`](Self::attach).
    pub async fn load<S: CatalogSource>(&mut self, loader: &PlaylistLoader<S>) -> Result<LoadSource, LoadError> {
        match loader.load().await {
            Ok(loaded) => {
                let source = loaded.source;
                self.attach(loaded.playlist, source);
                Ok(source)
            }
            Err(e) => {
                tracing::error!(error = %e, "Playlist could not be loaded");
                self.emit(ViewUpdate::LoadError {
                    message: format!("Couldn't load tracks: {e}"),
                });
                Err(e)
            }
        }
    }

    /// Binds a loaded playlist. Playback starts once the widget is ready too.
    pub fn attach(&mut self, playlist: Playlist, source: LoadSource) {
        if playlist.is_empty() {
            tracing::warn!("Refusing to attach an empty playlist");
            self.emit(ViewUpdate::LoadError {
                message: String::from("No tracks found"),
            });
            return;
        }
        tracing::info!(tracks = playlist.len(), ?source, "Playlist attached");
        self.emit(ViewUpdate::Loaded {
            tracks: playlist.len(),
            source,
        });
        self.playlist = playlist;
        self.state.current_index = 0;
        self.shuffle.reset();
        self.phase = PlayerPhase::Ready;
        if self.widget_ready {
            self.start_session();
        }
    }

    fn start_session(&mut self) {
        self.widget.set_volume(self.state.volume);
        self.render_now_playing();
        self.emit(ViewUpdate::Volume {
            level: self.state.volume,
            muted: self.state.volume == 0,
        });
        self.emit_modes();
        let Some(first) = self.playlist.first().map(|t| t.id.clone()) else {
            return;
        };
        self.widget.cue_by_id(&first);
        if self.recovery.is_in_app() {
            tracing::info!("In-app browser: autoplay disabled, waiting for a tap");
            self.notify("Tap the play button to start listening", Some(Duration::from_secs(4)));
        } else {
            self.widget.play();
        }
    }

    // ---- widget callbacks ----

    pub fn on_widget_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::Ready => self.on_ready(),
            WidgetEvent::StateChange(state) => self.on_state_change(state),
            WidgetEvent::Error(code) => self.on_error(code),
        }
    }

    fn on_ready(&mut self) {
        tracing::debug!("Widget ready");
        self.widget_ready = true;
        if !self.playlist.is_empty() {
            self.start_session();
        }
    }

    fn on_state_change(&mut self, state: WidgetState) {
        tracing::debug!(?state, "Widget state change");
        match state {
            WidgetState::Playing => self.on_playing(),
            WidgetState::Paused => self.on_paused(),
            WidgetState::Buffering => {
                self.state.is_buffering = true;
                self.phase = PlayerPhase::Buffering {
                    resume: self.state.is_playing,
                };
                self.emit_play_state();
            }
            WidgetState::Cued => {
                self.state.is_playing = false;
                self.state.is_buffering = false;
                self.phase = PlayerPhase::Ready;
                self.emit_play_state();
            }
            WidgetState::Ended => self.on_ended(),
            WidgetState::Unstarted => {}
        }
    }

    fn on_playing(&mut self) {
        self.state.is_playing = true;
        self.state.is_buffering = false;
        self.phase = PlayerPhase::Playing;
        self.expect_pause = false;
        self.recovery.on_playing();
        if let Some(track) = self.current_track() {
            self.telemetry
                .track_play(&track.title, self.state.current_index, track.duration);
        }
        self.emit_play_state();
        self.start_progress();
        if self.state.looper_mode.is_active() && !self.looper.is_armed() {
            self.arm_loop();
        }
    }

    fn on_paused(&mut self) {
        let expected = std::mem::take(&mut self.expect_pause);
        if !expected && self.recovery.is_in_app() {
            match self.recovery.on_unexpected_pause() {
                Some(RestartDecision::Retry { attempt }) => {
                    tracing::warn!(attempt, max = inapp::MAX_RESTART_ATTEMPTS, "Host paused playback, restarting");
                    self.scheduler
                        .schedule(TaskGroup::Recovery, inapp::RESTART_DELAY, Task::AutoRestart);
                    return;
                }
                Some(RestartDecision::GiveUp) => {
                    self.notify("The host app keeps pausing playback. Try the 'Listen with sound' button.", None);
                }
                None => {}
            }
        }

        self.state.is_playing = false;
        self.state.is_buffering = false;
        self.phase = PlayerPhase::Paused;
        if let Some(track) = self.current_track() {
            self.telemetry
                .track_pause(&track.title, self.widget.current_time(), self.widget.duration());
        }
        self.emit_play_state();
        self.scheduler.cancel_group(TaskGroup::Progress);
        self.disarm_loop();
    }

    fn on_ended(&mut self) {
        self.state.is_playing = false;
        self.state.is_buffering = false;
        self.phase = PlayerPhase::Ended;
        self.recovery.disable();
        self.scheduler.cancel_group(TaskGroup::Progress);
        self.disarm_loop();
        if let Some(track) = self.current_track() {
            self.telemetry.track_complete(&track.title, track.duration);
        }
        self.handle_track_end();
    }

    fn handle_track_end(&mut self) {
        let last = self.state.current_index + 1 >= self.playlist.len();
        match self.state.repeat_mode {
            RepeatMode::One => {
                tracing::debug!("Repeat one: restarting track");
                self.widget.seek(0.0, true);
                self.widget.play();
            }
            RepeatMode::All => {
                let index = self.step_index(Direction::Next);
                self.select_track(index, false);
            }
            RepeatMode::Off if !last => {
                let index = self.step_index(Direction::Next);
                self.select_track(index, false);
            }
            RepeatMode::Off => {
                tracing::info!("End of playlist");
                self.emit_play_state();
            }
        }
    }

    fn on_error(&mut self, code: WidgetErrorCode) {
        tracing::warn!(?code, reason = code.description(), "Widget playback error");
        self.state.is_buffering = false;
        self.phase = PlayerPhase::Error;
        self.scheduler.cancel_group(TaskGroup::Progress);
        self.disarm_loop();
        let index = self.state.current_index;
        let Some(track) = self.current_track().cloned() else {
            return;
        };

        match code {
            WidgetErrorCode::NotEmbeddable => {
                self.notify(
                    format!("\"{}\" cannot be played here. Opening on YouTube...", track.title),
                    Some(Duration::from_secs(3)),
                );
                if self.settings.open_unembeddable_externally {
                    self.scheduler.schedule(
                        TaskGroup::Transition,
                        OPEN_EXTERNAL_DELAY,
                        Task::OpenExternal { url: track.watch_url() },
                    );
                }
                self.scheduler
                    .schedule(TaskGroup::Transition, UNEMBEDDABLE_SKIP_DELAY, Task::SkipAfterError);
            }
            WidgetErrorCode::NotFound => {
                self.notify("Video not available, skipping...", Some(NOTIFY_DEFAULT));
                self.scheduler
                    .schedule(TaskGroup::Transition, ERROR_SKIP_DELAY, Task::SkipAfterError);
            }
            code if code.is_transient() && self.retried_index == Some(index) => {
                self.notify("Playback error, skipping...", Some(NOTIFY_DEFAULT));
                self.scheduler
                    .schedule(TaskGroup::Transition, ERROR_SKIP_DELAY, Task::SkipAfterError);
            }
            code if code.is_transient() => {
                self.retried_index = Some(index);
                self.notify("Playback error, retrying...", Some(NOTIFY_DEFAULT));
                self.scheduler.schedule(
                    TaskGroup::Transition,
                    ERROR_RELOAD_DELAY,
                    Task::ReloadAfterError { index },
                );
            }
            code => {
                self.notify(code.description(), Some(NOTIFY_DEFAULT));
            }
        }
    }

    // ---- scheduled work ----

    /// Runs every task whose deadline has passed.
    pub fn run_due_tasks(&mut self) {
        while let Some(task) = self.scheduler.pop_due(Instant::now()) {
            self.run_task(task);
        }
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::ProgressTick => {
                let position = self.widget.current_time();
                let duration = self.widget.duration();
                if position.is_finite() && duration.is_finite() && duration > 0.0 {
                    let _ = self.view.send(ViewUpdate::Progress { position, duration });
                }
            }
            Task::LoopCheck => {
                if let Some(start) = self.looper.check(self.widget.current_time()) {
                    tracing::trace!(start, "Looped back");
                    self.widget.seek(start, true);
                }
            }
            Task::FadeStep => self.fade_step(),
            Task::SwapTrack { index, resume, faded } => self.swap_track(index, resume, faded),
            Task::StartPlayback { fade_in } => {
                self.widget.play();
                if fade_in {
                    if self.recovery.is_in_app() {
                        self.start_fade(self.state.volume, FADE_IN);
                    } else {
                        self.scheduler
                            .schedule(TaskGroup::Transition, FADE_IN_DELAY, Task::StartFadeIn);
                    }
                }
            }
            Task::StartFadeIn => self.start_fade(self.state.volume, FADE_IN),
            Task::SkipAfterError => {
                let more = self.state.current_index + 1 < self.playlist.len();
                if more || self.state.repeat_mode == RepeatMode::All {
                    let index = self.step_index(Direction::Next);
                    self.select_track(index, false);
                }
            }
            Task::ReloadAfterError { index } => {
                if index == self.state.current_index
                    && let Some(id) = self.current_track().map(|t| t.id.clone())
                {
                    tracing::info!(%id, "Reloading track after transient error");
                    self.widget.load_by_id(&id, 0.0);
                }
            }
            Task::OpenExternal { url } => self.emit(ViewUpdate::OpenExternal { url }),
            Task::DismissNotification => self.emit(ViewUpdate::DismissNotification),
            Task::InAppLoad => {
                if let Some(id) = self.current_track().map(|t| t.id.clone()) {
                    self.widget.load_by_id(&id, 0.0);
                }
            }
            Task::InAppPlay => self.widget.play(),
            Task::InAppVerify => self.verify_in_app_playback(),
            Task::AutoRestart => self.widget.play(),
            Task::UnmuteCheck => {
                if matches!(self.widget.state(), WidgetState::Paused | WidgetState::Unstarted) {
                    tracing::warn!("Host blocked unmute, restarting playback");
                    self.widget.play();
                }
            }
        }
    }

    fn start_progress(&mut self) {
        self.scheduler.cancel_group(TaskGroup::Progress);
        self.scheduler
            .schedule_every(TaskGroup::Progress, PROGRESS_INTERVAL, Task::ProgressTick);
    }

    fn start_fade(&mut self, target: u8, duration: Duration) {
        self.scheduler.cancel_group(TaskGroup::Fade);
        self.fade = Some(Fade::new(self.widget.volume(), target));
        self.scheduler
            .schedule_every(TaskGroup::Fade, Fade::step_interval(duration), Task::FadeStep);
    }

    fn fade_step(&mut self) {
        let Some(fade) = self.fade.as_mut() else {
            self.scheduler.cancel_group(TaskGroup::Fade);
            return;
        };
        let volume = fade.advance();
        let finished = fade.is_finished();
        self.widget.set_volume(volume);
        if finished {
            self.fade = None;
            self.scheduler.cancel_group(TaskGroup::Fade);
        }
    }

    /// Cancels everything tied to the current track, including a pending
    /// in-app start sequence or restart, before anything new is scheduled.
    fn cancel_track_tasks(&mut self) {
        self.scheduler.cancel_groups(&TaskGroup::TRACK_SCOPED);
        self.looper.disarm();
        self.fade = None;
    }

    fn arm_loop(&mut self) {
        self.scheduler.cancel_group(TaskGroup::Loop);
        if self.looper.arm(self.widget.current_time()).is_some() {
            self.scheduler
                .schedule_every(TaskGroup::Loop, LOOP_CHECK_INTERVAL, Task::LoopCheck);
            self.version += 1;
        }
    }

    fn disarm_loop(&mut self) {
        self.scheduler.cancel_group(TaskGroup::Loop);
        self.looper.disarm();
    }

    // ---- track selection ----

    /// Switches to track `index`. With `preserve_play_state` the new track
    /// only starts if the old one was playing.
    pub fn select_track(&mut self, index: usize, preserve_play_state: bool) {
        if !self.is_ready() {
            tracing::warn!(index, "Player not ready yet");
            return;
        }
        if index >= self.playlist.len() {
            tracing::warn!(index, len = self.playlist.len(), "Track index out of range");
            return;
        }
        let was_playing = self.state.is_playing;
        let resume = !preserve_play_state || was_playing;
        self.cancel_track_tasks();

        if was_playing && self.state.volume > 0 {
            self.start_fade(0, FADE_OUT);
            self.scheduler.schedule(
                TaskGroup::Transition,
                SWAP_DELAY,
                Task::SwapTrack { index, resume, faded: true },
            );
        } else {
            self.swap_track(index, resume, false);
        }
    }

    fn swap_track(&mut self, index: usize, resume: bool, faded: bool) {
        let Some(id) = self.playlist.get(index).map(|t| t.id.clone()) else {
            return;
        };
        if index != self.state.current_index {
            self.retried_index = None;
        }
        self.state.current_index = index;
        self.phase = PlayerPhase::Ready;
        self.render_now_playing();

        if resume {
            self.widget.load_by_id(&id, 0.0);
            let delay = if self.recovery.is_in_app() { IN_APP_PLAY_DELAY } else { PLAY_DELAY };
            self.scheduler
                .schedule(TaskGroup::Transition, delay, Task::StartPlayback { fade_in: faded });
        } else {
            self.widget.cue_by_id(&id);
            if faded {
                self.widget.set_volume(self.state.volume);
            }
        }
    }

    fn step_index(&mut self, direction: Direction) -> usize {
        let len = self.playlist.len();
        let current = self.state.current_index;
        if len == 0 {
            return current;
        }
        match (self.state.shuffle_enabled, direction) {
            (true, Direction::Next) => self.shuffle.next(current, len),
            (true, Direction::Previous) => self.shuffle.previous(current, len),
            (false, Direction::Next) => (current + 1) % len,
            (false, Direction::Previous) => (current + len - 1) % len,
        }
    }

    fn skip(&mut self, direction: Direction) {
        if !self.is_ready() {
            return;
        }
        let index = self.step_index(direction);
        if let Some(track) = self.playlist.get(index) {
            self.telemetry.skip(direction.as_str(), &track.title);
        }
        self.select_track(index, true);
    }

    pub fn next(&mut self) {
        self.skip(Direction::Next);
    }

    pub fn previous(&mut self) {
        self.skip(Direction::Previous);
    }

    // ---- play / pause ----

    pub fn toggle_play_pause(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn play(&mut self) {
        if !self.is_ready() {
            tracing::warn!("Player not ready!");
            return;
        }
        if self.recovery.is_in_app() {
            self.start_in_app_playback();
        } else {
            self.widget.play();
        }
    }

    pub fn pause(&mut self) {
        if !self.is_ready() {
            return;
        }
        self.scheduler.cancel_group(TaskGroup::Recovery);
        self.pause_widget();
    }

    /// Pauses the widget, marking the resulting callback as ours. A widget
    /// that is not running sends no callback, so nothing is marked.
    fn pause_widget(&mut self) {
        if matches!(self.widget.state(), WidgetState::Playing | WidgetState::Buffering) {
            self.expect_pause = true;
        }
        self.widget.pause();
    }

    /// Halts playback and cancels every track-scoped task.
    pub fn stop(&mut self) {
        if !self.is_ready() {
            return;
        }
        self.cancel_track_tasks();
        self.pause_widget();
        self.widget.set_volume(self.state.volume);
        self.state.is_playing = false;
        self.state.is_buffering = false;
        self.phase = PlayerPhase::Paused;
        self.emit_play_state();
    }

    /// Cancels all scheduled work. Nothing runs after this returns.
    pub fn shutdown(&mut self) {
        tracing::debug!(pending = self.scheduler.len(), "Shutting down player");
        self.scheduler.cancel_all();
        self.looper.disarm();
        self.fade = None;
    }

    // ---- in-app recovery ----

    fn start_in_app_playback(&mut self) {
        tracing::info!("In-app browser: starting muted playback");
        self.widget.mute();
        self.widget.set_volume(0);
        self.scheduler.cancel_group(TaskGroup::Recovery);
        self.scheduler
            .schedule(TaskGroup::Recovery, inapp::LOAD_DELAY, Task::InAppLoad);
        self.scheduler
            .schedule(TaskGroup::Recovery, inapp::PLAY_DELAY, Task::InAppPlay);
        self.scheduler
            .schedule(TaskGroup::Recovery, inapp::VERIFY_DELAY, Task::InAppVerify);
    }

    fn verify_in_app_playback(&mut self) {
        let state = self.widget.state();
        if matches!(state, WidgetState::Playing | WidgetState::Buffering) {
            tracing::info!("Playing muted, auto-restart enabled");
            self.recovery.enable();
            self.notify("Playing muted due to in-app browser restrictions", Some(Duration::from_secs(4)));
            if !self.external_button_shown {
                self.external_button_shown = true;
                self.emit(ViewUpdate::ShowExternalButton);
            }
            self.state.volume = 0;
            self.emit(ViewUpdate::Volume { level: 0, muted: true });
        } else {
            tracing::warn!(?state, "Still not playing, opening externally");
            if let Some(url) = self.current_track().map(Track::watch_url) {
                self.emit(ViewUpdate::OpenExternal { url });
            }
            self.notify("Opening on YouTube...", Some(NOTIFY_DEFAULT));
        }
    }

    /// The "listen with sound" affordance: open the current track's page.
    pub fn open_external(&mut self) {
        let Some(track) = self.current_track().cloned() else {
            return;
        };
        tracing::info!(title = %track.title, "Opening track externally");
        self.telemetry.track_share(&track.title, "external_button");
        self.emit(ViewUpdate::OpenExternal { url: track.watch_url() });
    }

    // ---- volume ----

    pub fn set_volume(&mut self, volume: u8) {
        let volume = volume.min(100);
        self.scheduler.cancel_group(TaskGroup::Fade);
        self.fade = None;
        self.state.volume = volume;

        if volume > 0 {
            self.last_audible_volume = volume;
            if let Err(e) = self.store.set(VOLUME_KEY, &volume.to_string()) {
                tracing::warn!(error = %e, "Failed to persist volume");
            }
            if self.widget.is_muted() {
                self.widget.unmute();
                if self.recovery.is_in_app() {
                    self.scheduler.schedule(
                        TaskGroup::Recovery,
                        inapp::UNMUTE_CHECK_DELAY,
                        Task::UnmuteCheck,
                    );
                }
            }
        }
        self.widget.set_volume(volume);
        self.emit(ViewUpdate::Volume {
            level: volume,
            muted: volume == 0,
        });
    }

    pub fn toggle_mute(&mut self) {
        if self.state.volume > 0 {
            self.telemetry.volume(0, "mute");
            self.set_volume(0);
        } else {
            let restore = self.last_audible_volume;
            self.telemetry.volume(restore, "unmute");
            if self.recovery.is_in_app() {
                self.notify("Unmuting... If playback stops, tap play again.", Some(Duration::from_secs(3)));
            }
            self.set_volume(restore);
        }
    }

    pub fn adjust_volume(&mut self, delta: i16) {
        let volume = (i16::from(self.state.volume) + delta).clamp(0, 100);
        self.set_volume(volume as u8);
    }

    pub fn volume_up(&mut self) {
        self.adjust_volume(VOLUME_STEP);
    }

    pub fn volume_down(&mut self) {
        self.adjust_volume(-VOLUME_STEP);
    }

    /// Digit shortcut: `digit * 10` percent.
    pub fn set_volume_percent_key(&mut self, digit: u8) {
        let volume = digit.min(9) * 10;
        self.set_volume(volume);
        self.notify(format!("Volume: {volume}%"), Some(Duration::from_secs(1)));
    }

    // ---- seeking ----

    /// Click-seek to `fraction` of the track; re-arms an active loop there.
    pub fn seek_to_fraction(&mut self, fraction: f64) {
        if !self.is_ready() {
            return;
        }
        self.seek_fraction_raw(fraction);
        if self.state.looper_mode.is_active() && self.state.is_playing {
            self.arm_loop();
        }
    }

    fn seek_fraction_raw(&mut self, fraction: f64) -> f64 {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        let duration = self.widget.duration();
        let target = if duration.is_finite() { duration * fraction } else { 0.0 };
        self.widget.seek(target, true);
        target
    }

    pub fn seek_relative(&mut self, delta: f64) {
        if !self.is_ready() {
            return;
        }
        let duration = self.widget.duration().max(0.0);
        let target = (self.widget.current_time() + delta).clamp(0.0, duration);
        self.widget.seek(target, true);
    }

    pub fn seek_forward(&mut self) {
        self.seek_relative(SEEK_STEP);
    }

    pub fn seek_backward(&mut self) {
        self.seek_relative(-SEEK_STEP);
    }

    pub fn seek_to_start(&mut self) {
        if self.is_ready() {
            self.widget.seek(0.0, true);
        }
    }

    pub fn seek_to_end(&mut self) {
        if self.is_ready() {
            let target = (self.widget.duration() - 1.0).max(0.0);
            self.widget.seek(target, true);
        }
    }

    // ---- scrubbing ----

    pub fn begin_scrub(&mut self, fraction: f64) {
        if !self.is_ready() {
            return;
        }
        let was_playing = self.state.is_playing;
        self.scrub = Some(was_playing);
        if was_playing {
            self.scheduler.cancel_group(TaskGroup::Recovery);
            self.pause_widget();
        }
        self.disarm_loop();
        self.scrub_to(fraction);
    }

    pub fn scrub_to(&mut self, fraction: f64) {
        if self.scrub.is_none() {
            return;
        }
        let position = self.seek_fraction_raw(fraction);
        let duration = self.widget.duration();
        if duration.is_finite() && duration > 0.0 {
            let _ = self.view.send(ViewUpdate::Progress { position, duration });
        }
    }

    pub fn end_scrub(&mut self) {
        let Some(was_playing) = self.scrub.take() else {
            return;
        };
        if was_playing {
            self.widget.play();
            if self.state.looper_mode.is_active() {
                self.arm_loop();
            }
        }
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrub.is_some()
    }

    // ---- modes ----

    pub fn toggle_shuffle(&mut self) {
        self.state.shuffle_enabled = !self.state.shuffle_enabled;
        self.shuffle.reset();
        self.telemetry.shuffle(self.state.shuffle_enabled);
        let label = if self.state.shuffle_enabled { "ON" } else { "OFF" };
        self.notify(format!("Shuffle: {label}"), Some(NOTIFY_DEFAULT));
        self.emit_modes();
    }

    pub fn cycle_repeat(&mut self) {
        self.state.repeat_mode = self.state.repeat_mode.next();
        let mode = self.state.repeat_mode.as_str();
        self.telemetry.repeat(mode);
        self.notify(format!("Repeat: {}", mode.to_uppercase()), Some(NOTIFY_DEFAULT));
        self.emit_modes();
    }

    pub fn cycle_looper(&mut self) {
        let mode = self.state.looper_mode.next();
        self.set_looper_mode(mode);
    }

    pub fn set_looper_mode(&mut self, mode: LooperMode) {
        self.state.looper_mode = mode;
        self.scheduler.cancel_group(TaskGroup::Loop);
        self.looper.set_mode(mode);
        self.telemetry.looper(mode.as_str());
        let message = if mode.is_active() {
            format!("Looper: {} Bar", mode.as_str())
        } else {
            String::from("Looper: OFF")
        };
        self.notify(message, Some(NOTIFY_DEFAULT));
        if mode.is_active() && self.state.is_playing {
            self.arm_loop();
        }
        self.emit_modes();
    }

    // ---- likes and sharing ----

    /// Returns whether the track is liked afterwards.
    pub fn toggle_like(&mut self, track_id: &str) -> bool {
        let liked = self.likes.toggle(track_id, &self.store);
        if let Some(track) = self.playlist.iter().find(|t| t.id == track_id) {
            self.telemetry.track_like(&track.title, liked);
        }
        self.emit(ViewUpdate::Liked {
            id: track_id.to_string(),
            liked,
        });
        liked
    }

    pub fn toggle_like_current(&mut self) -> Option<bool> {
        let id = self.current_track()?.id.clone();
        Some(self.toggle_like(&id))
    }

    pub fn share(&mut self, platform: SharePlatform, index: usize) -> Option<String> {
        let track = self.playlist.get(index)?;
        let url = share_url(platform, &track.id, &track.title);
        self.telemetry.track_share(&track.title, platform.as_str());
        self.emit(ViewUpdate::OpenExternal { url: url.clone() });
        Some(url)
    }

    pub fn copy_link(&mut self, index: usize) -> Option<String> {
        let track = self.playlist.get(index)?;
        let url = watch_url(&track.id);
        self.telemetry.track_share(&track.title, "copy_link");
        self.emit(ViewUpdate::CopyToClipboard { url: url.clone() });
        self.notify("Copied!", Some(Duration::from_millis(1500)));
        Some(url)
    }

    // ---- snapshot ----

    pub fn snapshot(&self) -> PlayerSnapshot {
        let (position, duration) = if self.is_ready() {
            (self.widget.current_time(), self.widget.duration())
        } else {
            (0.0, 0.0)
        };
        PlayerSnapshot {
            version: self.version,
            phase: self.phase,
            current_index: self.state.current_index,
            track: self.current_track().cloned(),
            position,
            duration,
            is_playing: self.state.is_playing,
            is_buffering: self.state.is_buffering,
            volume: self.state.volume,
            muted: self.state.volume == 0 || self.widget.is_muted(),
            shuffle_enabled: self.state.shuffle_enabled,
            repeat_mode: self.state.repeat_mode,
            looper_mode: self.state.looper_mode,
            loop_window: self.looper.window(),
            auto_restart: self.recovery.auto_restart(),
        }
    }
}

fn load_saved_volume(store: &SharedStore) -> Option<u8> {
    match store.get(VOLUME_KEY) {
        Ok(Some(raw)) => raw.trim().parse::<u8>().ok().filter(|v| (1..=100).contains(v)),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read saved volume");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::telemetry::RecordingSink;
    use crate::view::ViewReceiver;
    use crate::widget::recording::{Command, RecordingWidget};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    const INSTAGRAM_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Instagram 302.0.0";

    struct Harness {
        ctl: PlayerController<RecordingWidget>,
        views: ViewReceiver,
        sink: Arc<RecordingSink>,
        store: SharedStore,
    }

    fn tracks(n: usize) -> Playlist {
        (0..n)
            .map(|i| Track {
                id: format!("t{i}"),
                title: format!("Track {i}"),
                thumbnail: String::new(),
                published_at: Default::default(),
                duration: 180,
                views: 0,
            })
            .collect()
    }

    fn harness(n: usize, user_agent: &str) -> Harness {
        let store: SharedStore = Arc::new(MemoryStore::new());
        harness_with_store(n, user_agent, store)
    }

    fn harness_with_store(n: usize, user_agent: &str, store: SharedStore) -> Harness {
        let (tx, views) = mpsc::unbounded_channel();
        let sink = Arc::new(RecordingSink::default());
        let settings = PlayerSettings {
            user_agent: user_agent.to_string(),
            ..PlayerSettings::default()
        };
        let mut ctl = PlayerController::new(
            RecordingWidget::default(),
            store.clone(),
            Telemetry::new(sink.clone()),
            tx,
            settings,
        )
        .with_shuffle(ShuffleSequencer::with_rng(StdRng::seed_from_u64(42)));
        ctl.attach(tracks(n), LoadSource::Catalog);
        ctl.on_widget_event(WidgetEvent::Ready);
        Harness { ctl, views, sink, store }
    }

    impl Harness {
        /// Advances paused time in 5 ms steps, running due tasks after each.
        async fn advance(&mut self, ms: u64) {
            for _ in 0..ms / 5 {
                tokio::time::advance(Duration::from_millis(5)).await;
                self.ctl.run_due_tasks();
            }
        }

        fn event(&mut self, state: WidgetState) {
            self.ctl.widget_mut().state = state;
            self.ctl.on_widget_event(WidgetEvent::StateChange(state));
        }

        fn clear_commands(&mut self) {
            self.ctl.widget_mut().commands.clear();
        }

        fn commands(&self) -> &[Command] {
            &self.ctl.widget().commands
        }

        fn drain_views(&mut self) -> Vec<ViewUpdate> {
            let mut out = Vec::new();
            while let Ok(update) = self.views.try_recv() {
                out.push(update);
            }
            out
        }

        fn notifications(&mut self) -> Vec<(String, Option<Duration>)> {
            self.drain_views()
                .into_iter()
                .filter_map(|u| match u {
                    ViewUpdate::Notification { message, dismiss_after } => Some((message, dismiss_after)),
                    _ => None,
                })
                .collect()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn regular_host_cues_and_autoplays_when_ready() {
        let h = harness(3, "Mozilla/5.0 Firefox/128.0");
        assert_eq!(
            h.commands(),
            &[Command::SetVolume(100), Command::Cue("t0".into()), Command::Play]
        );
        assert_eq!(h.ctl.phase(), PlayerPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn in_app_host_waits_for_a_tap() {
        let mut h = harness(3, INSTAGRAM_UA);
        assert_eq!(h.ctl.widget().count(&Command::Play), 0);
        assert!(h.ctl.is_in_app());
        let notes = h.notifications();
        assert_eq!(
            notes,
            vec![(
                String::from("Tap the play button to start listening"),
                Some(Duration::from_secs(4))
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ready_before_playlist_starts_on_attach() {
        let (tx, _views) = mpsc::unbounded_channel();
        let store: SharedStore = Arc::new(MemoryStore::new());
        let mut ctl = PlayerController::new(
            RecordingWidget::default(),
            store,
            Telemetry::disabled(),
            tx,
            PlayerSettings::default(),
        );
        ctl.on_widget_event(WidgetEvent::Ready);
        assert!(ctl.widget().commands.is_empty());
        ctl.attach(tracks(1), LoadSource::Cache);
        assert_eq!(ctl.widget().count(&Command::Play), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_one_restarts_the_same_track() {
        let mut h = harness(3, "");
        h.ctl.cycle_repeat();
        assert_eq!(h.ctl.state().repeat_mode, RepeatMode::One);
        h.event(WidgetState::Playing);
        h.ctl.widget_mut().time = 180.0;
        h.clear_commands();

        h.event(WidgetState::Ended);
        assert_eq!(h.commands(), &[Command::Seek(0.0, true), Command::Play]);
        assert_eq!(h.ctl.state().current_index, 0);

        h.event(WidgetState::Playing);
        assert!(h.ctl.state().is_playing);
        assert!(h.sink.names().contains(&String::from("track_complete")));
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_off_stops_on_the_last_track() {
        let mut h = harness(2, "");
        h.ctl.cycle_repeat();
        h.ctl.cycle_repeat();
        assert_eq!(h.ctl.state().repeat_mode, RepeatMode::Off);
        h.ctl.next();
        assert_eq!(h.ctl.state().current_index, 1);
        h.event(WidgetState::Playing);
        h.clear_commands();

        h.event(WidgetState::Ended);
        h.advance(2000).await;
        assert!(!h.ctl.state().is_playing);
        assert_eq!(h.ctl.state().current_index, 1);
        assert!(h.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_all_wraps_and_keeps_playing() {
        let mut h = harness(2, "");
        h.ctl.next();
        h.event(WidgetState::Playing);
        h.event(WidgetState::Ended);
        h.clear_commands();
        // Ended already flipped is_playing, so the swap happens without a fade.
        assert_eq!(h.ctl.state().current_index, 0);
        h.advance(150).await;
        assert_eq!(h.commands(), &[Command::Play]);
    }

    #[tokio::test(start_paused = true)]
    async fn end_of_track_loads_next_and_plays_after_delay() {
        let mut h = harness(3, "");
        h.event(WidgetState::Playing);
        h.clear_commands();
        h.event(WidgetState::Ended);
        assert_eq!(h.commands(), &[Command::Load("t1".into(), 0.0)]);
        h.advance(95).await;
        assert_eq!(h.ctl.widget().count(&Command::Play), 0);
        h.advance(10).await;
        assert_eq!(h.ctl.widget().count(&Command::Play), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_next_cues_without_playing() {
        let mut h = harness(3, "");
        h.clear_commands();
        h.ctl.next();
        h.advance(500).await;
        assert_eq!(h.commands(), &[Command::Cue("t1".into())]);
        assert_eq!(h.sink.names(), vec![String::from("track_skip")]);
    }

    #[tokio::test(start_paused = true)]
    async fn unmute_restores_the_last_audible_volume() {
        let mut h = harness(1, "");
        h.ctl.set_volume(37);
        h.ctl.toggle_mute();
        assert_eq!(h.ctl.state().volume, 0);
        assert_eq!(h.ctl.widget().volume, 0);
        h.ctl.toggle_mute();
        assert_eq!(h.ctl.state().volume, 37);
        assert_eq!(h.ctl.widget().volume, 37);

        h.ctl.set_volume(0);
        h.ctl.toggle_mute();
        assert_eq!(h.ctl.state().volume, 37);
        assert_eq!(h.store.get(VOLUME_KEY).unwrap().as_deref(), Some("37"));
    }

    #[tokio::test(start_paused = true)]
    async fn saved_volume_is_restored_on_start() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        store.set(VOLUME_KEY, "55").unwrap();
        let mut h = harness_with_store(1, "", store);
        assert_eq!(h.ctl.state().volume, 55);
        assert_eq!(h.commands()[0], Command::SetVolume(55));
        h.ctl.toggle_mute();
        h.ctl.toggle_mute();
        assert_eq!(h.ctl.state().volume, 55);
    }

    #[tokio::test(start_paused = true)]
    async fn volume_keys_clamp_and_notify() {
        let mut h = harness(1, "");
        h.ctl.volume_up();
        assert_eq!(h.ctl.state().volume, 100);
        h.ctl.set_volume_percent_key(3);
        assert_eq!(h.ctl.state().volume, 30);
        for _ in 0..5 {
            h.ctl.volume_down();
        }
        assert_eq!(h.ctl.state().volume, 0);
        let notes = h.notifications();
        assert_eq!(notes, vec![(String::from("Volume: 30%"), Some(Duration::from_secs(1)))]);
    }

    #[tokio::test(start_paused = true)]
    async fn track_swap_fades_out_and_back_to_target() {
        let mut h = harness(3, "");
        h.ctl.set_volume(80);
        h.event(WidgetState::Playing);
        h.clear_commands();

        h.ctl.select_track(2, true);
        h.advance(1300).await;

        let volumes = h.ctl.widget().volumes();
        let floor = volumes.iter().position(|v| *v == 0).expect("fade-out reaches 0");
        assert!(volumes[..=floor].windows(2).all(|w| w[0] >= w[1]));
        assert!(volumes[floor..].windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(volumes.last(), Some(&80));
        assert_eq!(h.ctl.widget().volume, 80);

        let load = h.commands().iter().position(|c| *c == Command::Load("t2".into(), 0.0)).unwrap();
        let play = h.commands().iter().position(|c| *c == Command::Play).unwrap();
        assert!(load < play);
        assert_eq!(h.ctl.state().current_index, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_swap_never_fires() {
        let mut h = harness(3, "");
        h.event(WidgetState::Playing);
        h.clear_commands();

        h.ctl.select_track(1, true);
        h.advance(100).await;
        h.ctl.select_track(2, true);
        h.advance(1500).await;

        assert_eq!(h.ctl.widget().count(&Command::Load("t1".into(), 0.0)), 0);
        assert_eq!(h.ctl.widget().count(&Command::Load("t2".into(), 0.0)), 1);
        assert_eq!(h.ctl.widget().volume, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_ticks_while_playing_and_stop_on_pause() {
        let mut h = harness(1, "");
        h.ctl.widget_mut().time = 30.0;
        h.event(WidgetState::Playing);
        h.drain_views();
        h.advance(260).await;
        assert!(h.drain_views().contains(&ViewUpdate::Progress { position: 30.0, duration: 180.0 }));

        h.ctl.pause();
        h.event(WidgetState::Paused);
        h.drain_views();
        h.advance(1000).await;
        assert!(
            !h.drain_views()
                .iter()
                .any(|u| matches!(u, ViewUpdate::Progress { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_everything() {
        let mut h = harness(2, "");
        h.ctl.cycle_looper();
        h.event(WidgetState::Playing);
        h.ctl.select_track(1, true);
        assert!(h.ctl.has_pending_tasks());

        h.ctl.shutdown();
        h.clear_commands();
        h.drain_views();
        h.advance(2000).await;
        assert!(!h.ctl.has_pending_tasks());
        assert!(h.commands().is_empty());
        assert!(h.drain_views().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_window_is_fixed_and_seeks_back() {
        let mut h = harness(1, "");
        h.ctl.set_looper_mode(LooperMode::Quarter);
        h.ctl.widget_mut().time = 10.0;
        h.event(WidgetState::Playing);
        let window = h.ctl.snapshot().loop_window.expect("armed on play");
        assert_eq!((window.start, window.end), (10.0, 12.0));

        h.ctl.widget_mut().time = 11.0;
        h.advance(200).await;
        assert_eq!(h.ctl.widget().count(&Command::Seek(10.0, true)), 0);

        // A buffering blip must not re-anchor the window.
        h.event(WidgetState::Buffering);
        h.event(WidgetState::Playing);
        assert_eq!(h.ctl.snapshot().loop_window, Some(window));

        h.ctl.widget_mut().time = 12.02;
        h.advance(60).await;
        assert_eq!(h.ctl.widget().count(&Command::Seek(10.0, true)), 1);
        assert_eq!(h.ctl.snapshot().loop_window, Some(window));
    }

    #[tokio::test(start_paused = true)]
    async fn looper_mode_change_rearms_while_playing() {
        let mut h = harness(1, "");
        h.ctl.widget_mut().time = 4.0;
        h.event(WidgetState::Playing);
        assert!(h.ctl.snapshot().loop_window.is_none());

        h.ctl.set_looper_mode(LooperMode::Eighth);
        let window = h.ctl.snapshot().loop_window.unwrap();
        assert_eq!((window.start, window.end), (4.0, 5.0));

        h.ctl.set_looper_mode(LooperMode::Off);
        assert!(h.ctl.snapshot().loop_window.is_none());
        assert_eq!(h.sink.names().iter().filter(|n| *n == "player_looper").count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn click_seek_rearms_the_loop_at_the_new_position() {
        let mut h = harness(1, "");
        h.ctl.set_looper_mode(LooperMode::Quarter);
        h.event(WidgetState::Playing);
        h.ctl.seek_to_fraction(0.5);
        let window = h.ctl.snapshot().loop_window.unwrap();
        assert_eq!((window.start, window.end), (90.0, 92.0));
    }

    #[tokio::test(start_paused = true)]
    async fn scrub_pauses_disarms_and_resumes() {
        let mut h = harness(1, "");
        h.ctl.set_looper_mode(LooperMode::Quarter);
        h.event(WidgetState::Playing);
        h.clear_commands();

        h.ctl.begin_scrub(0.5);
        assert!(h.ctl.is_scrubbing());
        assert_eq!(h.commands(), &[Command::Pause, Command::Seek(90.0, true)]);
        assert!(h.ctl.snapshot().loop_window.is_none());
        h.event(WidgetState::Paused);

        h.ctl.scrub_to(0.25);
        h.ctl.end_scrub();
        assert_eq!(h.commands().last(), Some(&Command::Play));
        let window = h.ctl.snapshot().loop_window.unwrap();
        assert_eq!(window.start, 45.0);
        assert!(!h.ctl.is_scrubbing());
    }

    #[tokio::test(start_paused = true)]
    async fn scrub_while_paused_does_not_resume() {
        let mut h = harness(1, "");
        h.clear_commands();
        h.ctl.begin_scrub(0.25);
        h.ctl.end_scrub();
        assert_eq!(h.commands(), &[Command::Seek(45.0, true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn keyboard_seeks_clamp_to_the_track() {
        let mut h = harness(1, "");
        h.ctl.widget_mut().time = 3.0;
        h.clear_commands();
        h.ctl.seek_backward();
        h.ctl.widget_mut().time = 178.0;
        h.ctl.seek_forward();
        h.ctl.seek_to_end();
        h.ctl.seek_to_start();
        assert_eq!(
            h.commands(),
            &[
                Command::Seek(0.0, true),
                Command::Seek(180.0, true),
                Command::Seek(179.0, true),
                Command::Seek(0.0, true),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unembeddable_track_opens_externally_then_skips() {
        let mut h = harness(3, "");
        h.drain_views();
        h.clear_commands();
        h.ctl.on_widget_event(WidgetEvent::Error(WidgetErrorCode::NotEmbeddable));
        assert_eq!(h.ctl.phase(), PlayerPhase::Error);

        h.advance(500).await;
        let views = h.drain_views();
        assert!(views.contains(&ViewUpdate::OpenExternal {
            url: String::from("https://www.youtube.com/watch?v=t0")
        }));
        assert!(h.commands().is_empty());

        h.advance(1000).await;
        assert_eq!(h.commands().first(), Some(&Command::Load("t1".into(), 0.0)));
        assert_eq!(h.ctl.state().current_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_video_on_last_track_without_repeat_stays_put() {
        let mut h = harness(2, "");
        h.ctl.cycle_repeat();
        h.ctl.cycle_repeat();
        h.ctl.next();
        h.clear_commands();
        h.ctl.on_widget_event(WidgetEvent::Error(WidgetErrorCode::NotFound));
        h.advance(2000).await;
        assert!(h.commands().is_empty());
        assert_eq!(h.ctl.state().current_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_retries_once_then_skips() {
        let mut h = harness(3, "");
        h.clear_commands();
        h.ctl.on_widget_event(WidgetEvent::Error(WidgetErrorCode::Html5));
        h.advance(1000).await;
        assert_eq!(h.commands(), &[Command::Load("t0".into(), 0.0)]);

        h.ctl.on_widget_event(WidgetEvent::Error(WidgetErrorCode::InvalidParameter));
        h.advance(1000).await;
        assert_eq!(h.commands().last(), Some(&Command::Load("t1".into(), 0.0)));
        assert_eq!(h.ctl.state().current_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn in_app_play_starts_muted_and_enables_auto_restart() {
        let mut h = harness(2, INSTAGRAM_UA);
        h.clear_commands();
        h.drain_views();

        h.ctl.play();
        assert_eq!(h.commands(), &[Command::Mute, Command::SetVolume(0)]);
        h.advance(100).await;
        assert_eq!(h.commands().last(), Some(&Command::Load("t0".into(), 0.0)));
        h.advance(500).await;
        assert_eq!(h.commands().last(), Some(&Command::Play));

        h.event(WidgetState::Playing);
        h.advance(900).await;
        let snapshot = h.ctl.snapshot();
        assert!(snapshot.auto_restart);
        assert_eq!(snapshot.volume, 0);
        assert!(snapshot.muted);
        let views = h.drain_views();
        assert!(views.contains(&ViewUpdate::ShowExternalButton));
        assert!(views.contains(&ViewUpdate::Volume { level: 0, muted: true }));
    }

    #[tokio::test(start_paused = true)]
    async fn in_app_play_falls_back_to_external_open() {
        let mut h = harness(2, INSTAGRAM_UA);
        h.drain_views();
        h.ctl.play();
        h.advance(1500).await;
        assert!(!h.ctl.snapshot().auto_restart);
        let views = h.drain_views();
        assert!(views.contains(&ViewUpdate::OpenExternal {
            url: String::from("https://www.youtube.com/watch?v=t0")
        }));
    }

    async fn muted_in_app_session() -> Harness {
        let mut h = harness(2, INSTAGRAM_UA);
        h.ctl.play();
        h.advance(600).await;
        h.event(WidgetState::Playing);
        h.advance(900).await;
        assert!(h.ctl.snapshot().auto_restart);
        h.clear_commands();
        h.drain_views();
        h
    }

    #[tokio::test(start_paused = true)]
    async fn host_pauses_are_answered_with_bounded_restarts() {
        let mut h = muted_in_app_session().await;
        for attempt in 1..=inapp::MAX_RESTART_ATTEMPTS {
            h.event(WidgetState::Paused);
            assert!(h.ctl.state().is_playing);
            h.advance(200).await;
            assert_eq!(h.ctl.widget().count(&Command::Play), attempt as usize);
        }

        h.event(WidgetState::Paused);
        h.advance(400).await;
        assert_eq!(h.ctl.widget().count(&Command::Play), inapp::MAX_RESTART_ATTEMPTS as usize);
        assert!(!h.ctl.snapshot().auto_restart);
        assert!(!h.ctl.state().is_playing);
        let notes = h.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].1, None);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_restart_refills_the_budget() {
        let mut h = muted_in_app_session().await;
        for _ in 0..(inapp::MAX_RESTART_ATTEMPTS * 2) {
            h.event(WidgetState::Paused);
            h.advance(200).await;
            h.event(WidgetState::Playing);
        }
        assert!(h.ctl.snapshot().auto_restart);
    }

    #[tokio::test(start_paused = true)]
    async fn requested_pause_is_not_restarted() {
        let mut h = muted_in_app_session().await;
        h.ctl.toggle_play_pause();
        h.event(WidgetState::Paused);
        h.advance(500).await;
        assert_eq!(h.ctl.widget().count(&Command::Play), 0);
        assert!(!h.ctl.state().is_playing);
        assert!(h.ctl.snapshot().auto_restart);
    }

    #[tokio::test(start_paused = true)]
    async fn unmuting_in_app_replays_if_the_host_paused() {
        let mut h = muted_in_app_session().await;
        h.ctl.set_volume(60);
        assert_eq!(h.commands(), &[Command::Unmute, Command::SetVolume(60)]);
        h.ctl.widget_mut().state = WidgetState::Paused;
        h.advance(300).await;
        assert_eq!(h.commands().last(), Some(&Command::Play));
    }

    #[tokio::test(start_paused = true)]
    async fn track_end_disables_auto_restart() {
        let mut h = muted_in_app_session().await;
        h.event(WidgetState::Ended);
        assert!(!h.ctl.snapshot().auto_restart);
    }

    #[tokio::test(start_paused = true)]
    async fn shuffle_next_and_previous_use_the_sequencer() {
        let mut h = harness(8, "");
        h.ctl.toggle_shuffle();
        h.ctl.next();
        let first = h.ctl.state().current_index;
        assert_ne!(first, 0);
        h.ctl.next();
        h.ctl.previous();
        assert_eq!(h.ctl.state().current_index, first);

        h.ctl.toggle_shuffle();
        h.ctl.next();
        assert_eq!(h.ctl.state().current_index, (first + 1) % 8);
        let names = h.sink.names();
        assert_eq!(names.iter().filter(|n| *n == "player_shuffle").count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_notification_replaces_the_dismiss_timer() {
        let mut h = harness(1, "");
        h.drain_views();
        h.ctl.toggle_shuffle();
        h.advance(1500).await;
        h.ctl.cycle_repeat();
        h.advance(1000).await;
        assert!(!h.drain_views().contains(&ViewUpdate::DismissNotification));
        h.advance(1000).await;
        assert_eq!(
            h.drain_views(),
            vec![ViewUpdate::DismissNotification]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn likes_and_shares_report_telemetry() {
        let mut h = harness(2, "");
        assert!(h.ctl.toggle_like("t1"));
        assert_eq!(h.ctl.toggle_like_current(), Some(true));
        assert!(!h.ctl.toggle_like("t1"));
        assert!(h.ctl.likes().contains("t0"));

        let url = h.ctl.share(SharePlatform::Facebook, 1).unwrap();
        assert!(url.starts_with("https://www.facebook.com/sharer/sharer.php?u="));
        assert_eq!(
            h.ctl.copy_link(0).as_deref(),
            Some("https://www.youtube.com/watch?v=t0")
        );
        assert_eq!(h.ctl.share(SharePlatform::YouTube, 9), None);

        let events = h.sink.events();
        let shares: Vec<_> = events
            .iter()
            .filter(|(name, _)| name == "track_share")
            .map(|(_, params)| params["share_platform"].clone())
            .collect();
        assert_eq!(shares, vec![serde_json::json!("facebook"), serde_json::json!("copy_link")]);
        assert_eq!(events.iter().filter(|(name, _)| name == "track_like").count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn intents_before_ready_are_ignored() {
        let (tx, _views) = mpsc::unbounded_channel();
        let mut ctl = PlayerController::new(
            RecordingWidget::default(),
            Arc::new(MemoryStore::new()),
            Telemetry::disabled(),
            tx,
            PlayerSettings::default(),
        );
        ctl.play();
        ctl.next();
        ctl.seek_to_fraction(0.5);
        ctl.select_track(3, false);
        assert!(ctl.widget().commands.is_empty());
        assert_eq!(ctl.phase(), PlayerPhase::Idle);
        assert_eq!(ctl.snapshot().track, None);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_track_tasks() {
        let mut h = harness(2, "");
        h.event(WidgetState::Playing);
        h.ctl.select_track(1, true);
        h.ctl.stop();
        h.clear_commands();
        h.advance(1000).await;
        assert!(h.commands().is_empty());
        assert_eq!(h.ctl.phase(), PlayerPhase::Paused);
        assert_eq!(h.ctl.state().current_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_a_pending_auto_restart() {
        let mut h = muted_in_app_session().await;
        h.event(WidgetState::Paused);
        h.ctl.stop();
        h.advance(500).await;
        assert_eq!(h.ctl.widget().count(&Command::Play), 0);
        assert!(!h.ctl.state().is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_in_app_start_sequence_runs_nothing() {
        let mut h = harness(2, INSTAGRAM_UA);
        h.ctl.play();
        h.advance(50).await;
        h.ctl.stop();
        h.clear_commands();
        h.drain_views();
        h.advance(2000).await;
        assert!(h.commands().is_empty());
        assert!(
            !h.drain_views()
                .iter()
                .any(|u| matches!(u, ViewUpdate::OpenExternal { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pause_during_in_app_start_sequence_runs_nothing() {
        let mut h = harness(2, INSTAGRAM_UA);
        h.ctl.play();
        h.advance(50).await;
        h.ctl.pause();
        h.clear_commands();
        h.advance(2000).await;
        assert!(h.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_a_track_drops_the_in_app_start_sequence() {
        let mut h = harness(2, INSTAGRAM_UA);
        h.ctl.play();
        h.advance(50).await;
        h.ctl.select_track(1, false);
        h.advance(2000).await;
        assert_eq!(h.ctl.widget().count(&Command::Load("t0".into(), 0.0)), 0);
        assert_eq!(h.ctl.widget().count(&Command::Load("t1".into(), 0.0)), 1);
        assert_eq!(h.ctl.state().current_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn redundant_pause_does_not_hide_a_host_pause() {
        let mut h = muted_in_app_session().await;
        h.ctl.widget_mut().state = WidgetState::Cued;
        h.ctl.pause();

        h.event(WidgetState::Paused);
        assert!(h.ctl.state().is_playing);
        h.advance(200).await;
        assert_eq!(h.ctl.widget().count(&Command::Play), 1);
    }
}
