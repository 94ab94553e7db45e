pub mod controller;
pub mod fade;
pub mod inapp;
pub mod looper;
pub mod schedule;
pub mod shuffle;
pub mod state;

pub use controller::{PlayerController, PlayerSettings};
pub use looper::LoopWindow;
pub use shuffle::ShuffleSequencer;
pub use state::{LooperMode, PlaybackState, PlayerPhase, PlayerSnapshot, RepeatMode};
