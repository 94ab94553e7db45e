use crate::player::PlayerController;
use crate::share::SharePlatform;
use crate::widget::{VideoWidget, WidgetEvent};

/// A user intent, decoupled from whatever input produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    TogglePlay,
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Select(usize),
    SeekForward,
    SeekBackward,
    SeekToStart,
    SeekToEnd,
    SeekFraction(f64),
    BeginScrub(f64),
    ScrubTo(f64),
    EndScrub,
    VolumeUp,
    VolumeDown,
    SetVolume(u8),
    VolumeDigit(u8),
    ToggleMute,
    ToggleShuffle,
    CycleRepeat,
    CycleLooper,
    LikeCurrent,
    Share(SharePlatform, usize),
    CopyLink(usize),
    OpenExternal,
    Quit,
}

impl Intent {
    /// Keyboard shortcut mapping. `key` uses DOM-style names for the
    /// non-character keys (`ArrowLeft`, `Home`, ...).
    pub fn from_key(key: &str) -> Option<Self> {
        let intent = match key {
            " " | "space" => Self::TogglePlay,
            "ArrowLeft" | "j" | "J" => Self::SeekBackward,
            "ArrowRight" | "l" | "L" => Self::SeekForward,
            "ArrowUp" => Self::VolumeUp,
            "ArrowDown" => Self::VolumeDown,
            "m" | "M" => Self::ToggleMute,
            "n" | "N" => Self::Next,
            "p" | "P" => Self::Previous,
            "s" | "S" => Self::ToggleShuffle,
            "r" | "R" => Self::CycleRepeat,
            "o" | "O" => Self::CycleLooper,
            "Home" => Self::SeekToStart,
            "End" => Self::SeekToEnd,
            k if k.len() == 1 && k.as_bytes()[0].is_ascii_digit() => Self::VolumeDigit(k.as_bytes()[0] - b'0'),
            _ => return None,
        };
        Some(intent)
    }

    /// Parses one line of the headless command protocol: either a shortcut
    /// key or a word command such as `select 3` or `share twitter 0`.
    /// Track numbers are 1-based on the wire.
    pub fn parse_command(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line == " " {
            return Some(Self::TogglePlay);
        }
        let line = line.trim();
        if let Some(intent) = Self::from_key(line) {
            return Some(intent);
        }
        let mut words = line.split_whitespace();
        let command = words.next()?.to_ascii_lowercase();
        let arg = words.next();
        let track = |s: Option<&str>| s?.parse::<usize>().ok()?.checked_sub(1);
        let fraction = |s: Option<&str>| s?.parse::<f64>().ok().filter(|f| f.is_finite());

        let intent = match command.as_str() {
            "toggle" => Self::TogglePlay,
            "play" => Self::Play,
            "pause" => Self::Pause,
            "stop" => Self::Stop,
            "next" => Self::Next,
            "prev" | "previous" => Self::Previous,
            "select" => Self::Select(track(arg)?),
            "seek" => Self::SeekFraction(fraction(arg)?),
            "scrub" => Self::BeginScrub(fraction(arg)?),
            "drag" => Self::ScrubTo(fraction(arg)?),
            "release" => Self::EndScrub,
            "volume" => Self::SetVolume(arg?.parse::<u8>().ok()?.min(100)),
            "mute" => Self::ToggleMute,
            "shuffle" => Self::ToggleShuffle,
            "repeat" => Self::CycleRepeat,
            "loop" => Self::CycleLooper,
            "like" => Self::LikeCurrent,
            "share" => {
                let platform = SharePlatform::parse(arg?)?;
                Self::Share(platform, track(words.next())?)
            }
            "copy" => Self::CopyLink(track(arg)?),
            "open" => Self::OpenExternal,
            "quit" | "exit" | "q" => Self::Quit,
            _ => return None,
        };
        Some(intent)
    }
}

#[derive(Debug)]
pub enum Event {
    Intent(Intent),
    Widget(WidgetEvent),
    Shutdown,
}

/// Applies one event to the player. Returns `false` once the loop should stop.
pub fn process_event<W: VideoWidget>(event: Event, player: &mut PlayerController<W>) -> bool {
    match event {
        Event::Widget(ev) => player.on_widget_event(ev),
        Event::Intent(Intent::Quit) | Event::Shutdown => {
            player.shutdown();
            return false;
        }
        Event::Intent(intent) => apply_intent(intent, player),
    }
    true
}

fn apply_intent<W: VideoWidget>(intent: Intent, player: &mut PlayerController<W>) {
    tracing::debug!(?intent, "Intent");
    match intent {
        Intent::TogglePlay => player.toggle_play_pause(),
        Intent::Play => player.play(),
        Intent::Pause => player.pause(),
        Intent::Stop => player.stop(),
        Intent::Next => player.next(),
        Intent::Previous => player.previous(),
        Intent::Select(index) => player.select_track(index, false),
        Intent::SeekForward => player.seek_forward(),
        Intent::SeekBackward => player.seek_backward(),
        Intent::SeekToStart => player.seek_to_start(),
        Intent::SeekToEnd => player.seek_to_end(),
        Intent::SeekFraction(f) => player.seek_to_fraction(f),
        Intent::BeginScrub(f) => player.begin_scrub(f),
        Intent::ScrubTo(f) => player.scrub_to(f),
        Intent::EndScrub => player.end_scrub(),
        Intent::VolumeUp => player.volume_up(),
        Intent::VolumeDown => player.volume_down(),
        Intent::SetVolume(v) => player.set_volume(v),
        Intent::VolumeDigit(d) => player.set_volume_percent_key(d),
        Intent::ToggleMute => player.toggle_mute(),
        Intent::ToggleShuffle => player.toggle_shuffle(),
        Intent::CycleRepeat => player.cycle_repeat(),
        Intent::CycleLooper => player.cycle_looper(),
        Intent::LikeCurrent => {
            player.toggle_like_current();
        }
        Intent::Share(platform, index) => {
            player.share(platform, index);
        }
        Intent::CopyLink(index) => {
            player.copy_link(index);
        }
        Intent::OpenExternal => player.open_external(),
        Intent::Quit => player.shutdown(),
    }
}
