//! Offline verse audio cache
//!
//! Layout: `<root>/<reciter_id>/<chapter>/<verse>.mp3`. Files are written
//! by `download_surah` and preferred by source resolution over the network.

use crate::error::{Error, Result};
use crate::playback::source::remote_url;
use crate::reciters::Reciter;
use std::path::{Path, PathBuf};
use tilawa_common::events::{EventBus, PlaybackPosition, TilawaEvent};
use tracing::{debug, info, warn};

/// Outcome of a chapter download
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DownloadSummary {
    /// Verses fetched from the network
    pub downloaded: u16,
    /// Verses already present in the cache
    pub skipped: u16,
}

/// Local file cache for pre-downloaded verse audio
#[derive(Debug, Clone)]
pub struct AudioCache {
    root: PathBuf,
    client: reqwest::Client,
}

impl AudioCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_client(root, reqwest::Client::new())
    }

    pub fn with_client(root: impl Into<PathBuf>, client: reqwest::Client) -> Self {
        Self {
            root: root.into(),
            client,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the cache root if missing
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn surah_dir(&self, reciter_id: &str, chapter: u16) -> PathBuf {
        self.root.join(reciter_id).join(chapter.to_string())
    }

    /// Expected cache path of one verse
    pub fn verse_path(&self, reciter_id: &str, chapter: u16, verse: u16) -> PathBuf {
        self.surah_dir(reciter_id, chapter)
            .join(format!("{}.mp3", verse))
    }

    /// True if a regular file exists at `path`; I/O errors count as absent
    pub async fn exists(&self, path: &Path) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(meta) => meta.is_file(),
            Err(_) => false,
        }
    }

    /// True if every verse of the chapter is cached
    pub async fn is_surah_downloaded(&self, reciter_id: &str, chapter: u16, verse_count: u16) -> bool {
        for verse in 1..=verse_count {
            if !self.exists(&self.verse_path(reciter_id, chapter, verse)).await {
                return false;
            }
        }
        verse_count > 0
    }

    /// Delete a chapter's cached files; absent directories are not an error
    pub async fn remove_surah(&self, reciter_id: &str, chapter: u16) -> Result<()> {
        let dir = self.surah_dir(reciter_id, chapter);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!("Removed cached audio {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch every missing verse of a chapter into the cache
    ///
    /// Each file is written to a `.part` sibling and renamed into place, so a
    /// partial download is never picked up by resolution. Stops at the first
    /// failure; verses fetched before it stay cached.
    pub async fn download_surah(
        &self,
        reciter: &Reciter,
        chapter: u16,
        verse_count: u16,
        events: &EventBus,
    ) -> Result<DownloadSummary> {
        if verse_count == 0 {
            return Err(Error::Cache(format!("chapter {} has no verses", chapter)));
        }

        let dir = self.surah_dir(&reciter.id, chapter);
        tokio::fs::create_dir_all(&dir).await?;

        let mut summary = DownloadSummary {
            downloaded: 0,
            skipped: 0,
        };

        for verse in 1..=verse_count {
            let path = self.verse_path(&reciter.id, chapter, verse);
            if self.exists(&path).await {
                summary.skipped += 1;
            } else {
                let url = remote_url(reciter, PlaybackPosition::new(chapter, verse))?;
                self.fetch_to(&url, &path).await.map_err(|e| {
                    warn!("Download of {} failed: {}", url, e);
                    e
                })?;
                summary.downloaded += 1;
            }

            events.emit_lossy(TilawaEvent::DownloadProgress {
                reciter_id: reciter.id.clone(),
                chapter,
                completed: verse,
                total: verse_count,
                timestamp: chrono::Utc::now(),
            });
        }

        info!(
            "Chapter {} for {} cached: {} downloaded, {} already present",
            chapter, reciter.id, summary.downloaded, summary.skipped
        );
        Ok(summary)
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> Result<()> {
        debug!("Downloading {} -> {}", url, path.display());
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let partial = path.with_extension("mp3.part");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, path).await?;
        Ok(())
    }
}
