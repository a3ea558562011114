//! Recitation playback

pub mod engine;
pub mod listeners;
pub mod sequence;
pub mod source;

pub use engine::{EngineComponents, EngineStatus, PlaybackMode, RecitationEngine};
pub use listeners::ListenerHandle;
