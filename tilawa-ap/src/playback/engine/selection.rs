//! Reciter selection and offline cache operations

use super::core::RecitationEngine;
use crate::cache::DownloadSummary;
use crate::db::settings::save_selected_reciter;
use crate::error::{Error, Result};
use crate::reciters::Reciter;
use tilawa_common::events::TilawaEvent;
use tracing::{info, warn};

impl RecitationEngine {
    pub fn list_reciters(&self) -> &[Reciter] {
        self.catalog.all()
    }

    pub fn find_reciter(&self, id: &str) -> Option<Reciter> {
        self.catalog.find(id).cloned()
    }

    /// Select a reciter (or none) and persist the choice
    ///
    /// Playback is left alone: a loaded verse keeps its audio, and the new
    /// reciter applies from the next verse resolved.
    pub async fn set_reciter(&self, reciter: Option<Reciter>) {
        let reciter_id = reciter.as_ref().map(|r| r.id.clone());
        match &reciter {
            Some(r) => info!("Reciter set to {} ({})", r.name, r.id),
            None => info!("Reciter cleared"),
        }
        self.set_current_reciter(reciter);

        if let Err(e) = save_selected_reciter(self.settings.as_ref(), reciter_id.as_deref()).await {
            warn!("Failed to persist reciter selection: {}", e);
        }

        self.events.emit_lossy(TilawaEvent::ReciterChanged {
            reciter_id,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Download every verse of `chapter` for the current reciter
    pub async fn download_surah(&self, chapter: u16) -> Result<DownloadSummary> {
        let reciter = self.require_reciter()?;
        let verse_count = self.require_verse_count(chapter).await?;
        self.cache
            .download_surah(&reciter, chapter, verse_count, &self.events)
            .await
    }

    /// True if the current reciter's audio for `chapter` is fully cached
    pub async fn is_surah_downloaded(&self, chapter: u16) -> Result<bool> {
        let reciter = self.require_reciter()?;
        let verse_count = self.require_verse_count(chapter).await?;
        Ok(self
            .cache
            .is_surah_downloaded(&reciter.id, chapter, verse_count)
            .await)
    }

    /// Delete the current reciter's cached audio for `chapter`
    pub async fn remove_surah(&self, chapter: u16) -> Result<()> {
        let reciter = self.require_reciter()?;
        self.cache.remove_surah(&reciter.id, chapter).await
    }

    fn require_reciter(&self) -> Result<Reciter> {
        self.current_reciter()
            .ok_or_else(|| Error::InvalidState("no reciter selected".to_string()))
    }

    async fn require_verse_count(&self, chapter: u16) -> Result<u16> {
        self.chapter_lengths
            .verse_count(chapter)
            .await?
            .ok_or_else(|| Error::NotFound(format!("chapter {}", chapter)))
    }
}
