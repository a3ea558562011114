//! Audio type definitions shared by the engine and output backends

use std::path::PathBuf;
use tokio::sync::mpsc;

/// Identifies one loaded audio resource
///
/// Strictly increasing per engine, so status from an unloaded resource can
/// be recognized and ignored.
pub type LoadId = u64;

/// Channel carrying device status updates to the engine
pub type StatusSender = mpsc::UnboundedSender<AudioStatus>;
pub type StatusReceiver = mpsc::UnboundedReceiver<AudioStatus>;

pub fn status_channel() -> (StatusSender, StatusReceiver) {
    mpsc::unbounded_channel()
}

/// Playable location of one verse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Pre-downloaded file in the local cache
    LocalFile(PathBuf),
    /// Reciter archive URL
    RemoteUrl(String),
}

impl AudioSource {
    pub fn is_local(&self) -> bool {
        matches!(self, AudioSource::LocalFile(_))
    }

    /// URI form for logging and status reporting
    pub fn uri(&self) -> String {
        match self {
            AudioSource::LocalFile(path) => format!("file://{}", path.display()),
            AudioSource::RemoteUrl(url) => url.clone(),
        }
    }
}

impl std::fmt::Display for AudioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Status update reported by an output backend
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioStatus {
    pub load_id: LoadId,
    pub is_loaded: bool,
    pub is_playing: bool,
    /// Set once when the resource reached its natural end
    pub did_just_finish: bool,
    pub error: Option<String>,
}

impl AudioStatus {
    pub fn playing(load_id: LoadId) -> Self {
        Self {
            load_id,
            is_loaded: true,
            is_playing: true,
            ..Self::default()
        }
    }

    pub fn paused(load_id: LoadId) -> Self {
        Self {
            load_id,
            is_loaded: true,
            ..Self::default()
        }
    }

    pub fn finished(load_id: LoadId) -> Self {
        Self {
            load_id,
            is_loaded: true,
            did_just_finish: true,
            ..Self::default()
        }
    }

    /// The output no longer holds the resource
    pub fn unloaded(load_id: LoadId) -> Self {
        Self {
            load_id,
            ..Self::default()
        }
    }

    pub fn failed(load_id: LoadId, error: impl Into<String>) -> Self {
        Self {
            load_id,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
