//! Recitation engine
//!
//! **Module Structure:**
//! - `core.rs`: State, lifecycle, status handling, queries, listeners
//! - `playback.rs`: Play, pause, resume, stop, advance, reciter switch
//! - `selection.rs`: Reciter selection and offline cache operations

mod core;
mod playback;
mod selection;

pub use self::core::{EngineComponents, EngineStatus, PlaybackMode, RecitationEngine};
