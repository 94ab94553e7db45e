//! Messages from the controller to whatever renders it, plus a plain-text
//! renderer that prints them line by line for scripting.

use crate::catalog::{LoadSource, Track};
use crate::player::state::{LooperMode, RepeatMode};
use crate::text_utils::{format_published, format_time, format_views};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    Loaded { tracks: usize, source: LoadSource },
    LoadError { message: String },
    NowPlaying { index: usize, track: Track, liked: bool },
    PlayState { playing: bool, buffering: bool },
    Progress { position: f64, duration: f64 },
    Volume { level: u8, muted: bool },
    Modes { shuffle: bool, repeat: RepeatMode, looper: LooperMode },
    Liked { id: String, liked: bool },
    /// `None` keeps the notification up until replaced or dismissed.
    Notification { message: String, dismiss_after: Option<Duration> },
    DismissNotification,
    OpenExternal { url: String },
    CopyToClipboard { url: String },
    /// Reveal the "listen with sound" affordance on restrictive hosts.
    ShowExternalButton,
}

pub type ViewSender = mpsc::UnboundedSender<ViewUpdate>;
pub type ViewReceiver = mpsc::UnboundedReceiver<ViewUpdate>;

/// One printable line for `update`, or `None` for updates with no text form.
pub fn render_line(update: &ViewUpdate) -> Option<String> {
    let line = match update {
        ViewUpdate::Loaded { tracks, source } => format!("loaded {tracks} tracks ({source:?})"),
        ViewUpdate::LoadError { message } => format!("error: {message}"),
        ViewUpdate::NowPlaying { index, track, liked } => format!(
            "#{} {}{} [{}] {} | {} views",
            index + 1,
            track.title,
            if *liked { " ♥" } else { "" },
            format_time(f64::from(track.duration)),
            format_published(track.published_at, chrono::Utc::now()),
            format_views(track.views),
        ),
        ViewUpdate::PlayState { playing, buffering } => match (playing, buffering) {
            (_, true) => "buffering".to_string(),
            (true, false) => "playing".to_string(),
            (false, false) => "paused".to_string(),
        },
        ViewUpdate::Progress { position, duration } => {
            format!("{} / {}", format_time(*position), format_time(*duration))
        }
        ViewUpdate::Volume { level, muted } => {
            if *muted { format!("volume {level} (muted)") } else { format!("volume {level}") }
        }
        ViewUpdate::Modes { shuffle, repeat, looper } => format!(
            "shuffle {} | repeat {} | loop {}",
            if *shuffle { "on" } else { "off" },
            repeat.as_str(),
            looper.as_str()
        ),
        ViewUpdate::Liked { id, liked } => format!("{} {id}", if *liked { "liked" } else { "unliked" }),
        ViewUpdate::Notification { message, .. } => format!("» {message}"),
        ViewUpdate::OpenExternal { url } => format!("open {url}"),
        ViewUpdate::CopyToClipboard { url } => format!("copied {url}"),
        ViewUpdate::ShowExternalButton => "tap 'listen with sound' to open externally".to_string(),
        ViewUpdate::DismissNotification => return None,
    };
    Some(line)
}

/// Print updates to stdout until the channel closes. Progress lines are only
/// printed when the displayed second changes.
pub async fn display_pipe(mut rx: ViewReceiver) {
    let mut last_progress: Option<String> = None;
    while let Some(update) = rx.recv().await {
        let Some(line) = render_line(&update) else { continue };
        if matches!(update, ViewUpdate::Progress { .. }) {
            if last_progress.as_deref() == Some(line.as_str()) {
                continue;
            }
            last_progress = Some(line.clone());
        }
        println!("{line}");
    }
}
