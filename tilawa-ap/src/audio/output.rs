//! Audio output abstraction

use crate::audio::types::{AudioSource, LoadId, StatusSender};
use crate::error::Result;
use async_trait::async_trait;

/// Device audio output owning at most one loaded resource
///
/// The engine is the only caller and always unloads before loading again.
/// `unload` may be called while a `load` is still in flight; that load must
/// then not start playing.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Configure the device for background-capable, mixable playback
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Decode `source` and start playing it
    ///
    /// Returns once playback started, or once the load was abandoned because
    /// of a newer `load` or an `unload`. Later transitions (pause, natural
    /// end, release, runtime errors) are reported on `status_tx` tagged with
    /// `load_id`.
    async fn load(&self, load_id: LoadId, source: &AudioSource, status_tx: StatusSender) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    /// Release the loaded resource; no-op if nothing is loaded
    async fn unload(&self) -> Result<()>;
}
