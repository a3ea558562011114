//! HTTP control surface
//!
//! REST endpoints for reciter selection, playback control and the offline
//! cache, plus an SSE stream of engine events.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, run, AppContext};
