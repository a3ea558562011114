//! # Tilawa Audio Player Library (tilawa-ap)
//!
//! Sequential recitation playback: plays Quran verse audio verse by verse
//! and chapter by chapter, preferring locally cached files over the
//! reciter's remote archive.
//!
//! **Architecture:** a `RecitationEngine` service object driving an
//! `AudioOutput` (symphonia + rubato + cpal for the real device), with
//! reciter selection persisted in a SQLite settings table and an
//! HTTP/SSE control interface.

pub mod api;
pub mod audio;
pub mod cache;
pub mod chapters;
pub mod config;
pub mod db;
pub mod error;
pub mod playback;
pub mod reciters;

pub use error::{Error, Result};
pub use playback::RecitationEngine;
