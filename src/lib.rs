//! Playlist-backed audio player core.
//!
//! A [`player::PlayerController`] mediates between user intents and an
//! externally owned video widget, layering shuffle sequencing, a beat-synced
//! A/B looper and in-app-browser autoplay recovery on top of raw play/pause.
//! Rendering is left to whoever consumes the [`view::ViewUpdate`] channel.

pub mod catalog;
pub mod config;
pub mod event;
pub mod likes;
pub mod player;
pub mod pool;
pub mod share;
pub mod store;
pub mod telemetry;
pub mod text_utils;
pub mod timer;
pub mod view;
pub mod widget;

pub use config::Config;
