//! # Tilawa Common Library
//!
//! Shared code for the Tilawa recitation services including:
//! - Event types (TilawaEvent enum) and the EventBus
//! - Playback position and stop reason types
//! - Configuration file and root folder resolution
//! - Common error type

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{EventBus, PlaybackPosition, StopReason, TilawaEvent};
