use clap::Parser;
use playlist_player::catalog::{CatalogCache, PlaylistLoader, YouTubeCatalog};
use playlist_player::event::Intent;
use playlist_player::player::PlayerController;
use playlist_player::store::{FileStore, MemoryStore, SharedStore};
use playlist_player::telemetry::{Telemetry, TracingSink};
use playlist_player::widget::SimulatedWidget;
use playlist_player::{Config, pool, view};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

fn init_logging(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(cfg: &Config) -> SharedStore {
    match &cfg.store {
        Some(path) => Arc::new(FileStore::open_or_empty(path)),
        None => Arc::new(MemoryStore::new()),
    }
}

/// Forwards stdin lines as intents. Unknown commands are logged and skipped.
async fn read_intents(intent_tx: mpsc::UnboundedSender<Intent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match Intent::parse_command(&line) {
                Some(intent) => {
                    let quit = intent == Intent::Quit;
                    if intent_tx.send(intent).is_err() || quit {
                        break;
                    }
                }
                None => tracing::warn!(%line, "Unknown command"),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut cfg = Config::parse();
    cfg.apply_env_fallbacks();
    init_logging(&cfg);

    let store = open_store(&cfg);
    let cache = CatalogCache::new(store.clone());

    if cfg.cache_info {
        println!("{}", serde_json::to_string_pretty(&cache.info())?);
        return Ok(());
    }
    if cfg.clear_cache {
        cache.clear();
        println!("Cache cleared.");
        return Ok(());
    }

    let (Some(api_key), Some(playlist_id)) = (cfg.api_key.clone(), cfg.playlist_id.clone()) else {
        return Err("missing credentials: pass --api-key/--playlist-id or set YOUTUBE_API_KEY/PLAYLIST_ID".into());
    };
    let mut catalog = YouTubeCatalog::new(api_key, playlist_id);
    catalog.max_results = cfg.max_results;

    let telemetry = if cfg.no_telemetry {
        Telemetry::disabled()
    } else {
        Telemetry::new(Arc::new(TracingSink))
    };
    let loader = PlaylistLoader::new(catalog, cache, telemetry.clone());
    if cfg.refresh_cache {
        loader.cache().clear();
    }

    let (view_tx, view_rx) = mpsc::unbounded_channel();
    let display = tokio::spawn(view::display_pipe(view_rx));
    let (widget_tx, widget_rx) = mpsc::unbounded_channel();
    let widget = SimulatedWidget::new(widget_tx);
    let mut player = PlayerController::new(widget, store, telemetry, view_tx, cfg.player_settings());

    if let Err(e) = player.load(&loader).await {
        drop(player);
        let _ = display.await;
        return Err(e.into());
    }
    let playlist = player.playlist().clone();
    player.widget_mut().register_tracks(&playlist);

    let (intent_tx, intent_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(read_intents(intent_tx.clone()));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    let poll_interval = Duration::from_millis(cfg.poll_interval_ms.max(10));
    let player = pool::listen(player, intent_rx, widget_rx, shutdown_rx, poll_interval).await;
    tracing::info!(snapshot = ?player.snapshot(), "Player stopped");
    drop(player);
    drop(intent_tx);
    let _ = display.await;
    Ok(())
}
