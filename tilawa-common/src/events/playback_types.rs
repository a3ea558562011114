//! Playback-related type definitions
//!
//! Supporting types for recitation position and session termination.

use serde::{Deserialize, Serialize};

/// Chapter/verse pair identifying what is loaded or playing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackPosition {
    /// Chapter (surah) number, 1-based
    pub chapter: u16,
    /// Verse (ayah) number within the chapter, 1-based
    pub verse: u16,
}

impl PlaybackPosition {
    pub fn new(chapter: u16, verse: u16) -> Self {
        Self { chapter, verse }
    }
}

impl std::fmt::Display for PlaybackPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.chapter, self.verse)
    }
}

/// Why a playback session ended
///
/// Lets consumers tell an intentional stop apart from a failure without
/// inferring it from the playing flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// Caller requested the stop
    UserStopped,
    /// Single-verse playback finished
    Completed,
    /// Final verse of the final chapter finished
    CompletedCorpus,
    /// Device reported a decode or network failure
    PlaybackError { message: String },
    /// No playable source could be built for the verse
    ResolutionError { message: String },
    /// Chapter lengths unknown, cannot decide where to advance
    MetadataUnavailable,
}

impl StopReason {
    /// True for reasons that indicate something went wrong
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StopReason::PlaybackError { .. }
                | StopReason::ResolutionError { .. }
                | StopReason::MetadataUnavailable
        )
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::UserStopped => write!(f, "user_stopped"),
            StopReason::Completed => write!(f, "completed"),
            StopReason::CompletedCorpus => write!(f, "completed_corpus"),
            StopReason::PlaybackError { message } => write!(f, "playback_error: {}", message),
            StopReason::ResolutionError { message } => write!(f, "resolution_error: {}", message),
            StopReason::MetadataUnavailable => write!(f, "metadata_unavailable"),
        }
    }
}
