//! Test helper modules for tilawa-ap integration tests
//!
//! - RecordingOutput: `AudioOutput` double that records calls and lets a
//!   test report status for the loaded verse
//! - TestEngine: engine wired to an in-memory settings database and a
//!   temporary cache root

#![allow(dead_code)]

pub mod harness;
pub mod recording_output;

pub use harness::{
    memory_settings, positions, stop_reasons, test_catalog, EngineBuilder, TestEngine,
    UnavailableChapters,
};
pub use recording_output::{OutputCall, RecordingOutput};
