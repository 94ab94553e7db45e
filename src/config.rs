use crate::player::PlayerSettings;
use clap::Parser;
use std::path::PathBuf;

pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";
pub const PLAYLIST_ID_ENV: &str = "PLAYLIST_ID";

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// YouTube Data API key. Falls back to the YOUTUBE_API_KEY env var.
    #[arg(long)]
    pub api_key: Option<String>,
    /// Playlist to play. Falls back to the PLAYLIST_ID env var.
    #[arg(long)]
    pub playlist_id: Option<String>,
    /// Maximum number of playlist entries to fetch
    #[arg(long, default_value_t = 12)]
    pub max_results: u32,
    /// JSON file backing the key-value store (cache, volume, likes). In-memory if omitted.
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,
    /// Host identifying string, checked for restrictive in-app browsers
    #[arg(long, default_value = "")]
    pub user_agent: String,
    /// Skip unembeddable tracks without opening them externally
    #[arg(long = "no-open-external")]
    pub no_open_external: bool,
    /// Disable telemetry events
    #[arg(long = "no-telemetry")]
    pub no_telemetry: bool,
    /// How often the widget is polled for state changes, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub poll_interval_ms: u64,
    /// Print cache age and validity, then exit
    #[arg(long)]
    pub cache_info: bool,
    /// Remove the cached playlist, then exit
    #[arg(long)]
    pub clear_cache: bool,
    /// Remove the cached playlist and fetch it again before playing
    #[arg(long)]
    pub refresh_cache: bool,
    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            playlist_id: None,
            max_results: 12,
            store: None,
            user_agent: String::new(),
            no_open_external: false,
            no_telemetry: false,
            poll_interval_ms: 100,
            cache_info: false,
            clear_cache: false,
            refresh_cache: false,
            debug_log: false,
        }
    }
}

impl Config {
    /// Fills credentials missing on the command line from the environment.
    pub fn apply_env_fallbacks(&mut self) {
        self.apply_fallbacks_from(|key| std::env::var(key).ok());
    }

    fn apply_fallbacks_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let from = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if self.api_key.is_none() {
            self.api_key = from(API_KEY_ENV);
        }
        if self.playlist_id.is_none() {
            self.playlist_id = from(PLAYLIST_ID_ENV);
        }
    }

    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            user_agent: self.user_agent.clone(),
            open_unembeddable_externally: !self.no_open_external,
        }
    }

    pub fn default_log_filter(&self) -> &'static str {
        if self.debug_log { "playlist_player=debug,telemetry=info" } else { "playlist_player=info,telemetry=warn" }
    }
}
