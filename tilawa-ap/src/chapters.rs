//! Chapter metadata
//!
//! The engine only needs one fact per chapter: how many verses it has, to
//! decide whether a finished verse was the last of its chapter.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Number of chapters; sequential playback never wraps past it
pub const FINAL_CHAPTER: u16 = 114;

/// Verse count of every chapter in order (6236 verses in total)
const VERSE_COUNTS: [u16; FINAL_CHAPTER as usize] = [
    7, 286, 200, 176, 120, 165, 206, 75, 129, 109, 123, 111, 43, 52, 99, 128, 111, 110, 98, 135,
    112, 78, 118, 64, 77, 227, 93, 88, 69, 60, 34, 30, 73, 54, 45, 83, 182, 88, 75, 85, 54, 53,
    89, 59, 37, 35, 38, 29, 18, 45, 60, 49, 62, 55, 78, 96, 29, 22, 24, 13, 14, 11, 11, 18, 12,
    12, 30, 52, 52, 44, 28, 28, 20, 56, 40, 31, 50, 40, 46, 42, 29, 19, 36, 25, 22, 17, 19, 26,
    30, 20, 15, 21, 11, 8, 8, 19, 5, 8, 8, 11, 11, 8, 3, 9, 5, 4, 7, 3, 6, 3, 5, 4, 5, 6,
];

/// Chapter metadata entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChapterInfo {
    pub id: u16,
    pub verses_count: u16,
    #[serde(default, alias = "name_simple")]
    pub name: Option<String>,
}

/// Source of chapter metadata
#[async_trait]
pub trait ChapterMetadataProvider: Send + Sync {
    async fn list_chapters(&self) -> Result<Vec<ChapterInfo>>;
}

/// Provider backed by the compiled-in verse counts
#[derive(Debug, Default, Clone)]
pub struct BuiltinChapters;

#[async_trait]
impl ChapterMetadataProvider for BuiltinChapters {
    async fn list_chapters(&self) -> Result<Vec<ChapterInfo>> {
        Ok(VERSE_COUNTS
            .iter()
            .enumerate()
            .map(|(index, &verses_count)| ChapterInfo {
                id: index as u16 + 1,
                verses_count,
                name: None,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ChaptersResponse {
    chapters: Vec<ChapterInfo>,
}

/// Provider fetching `{"chapters": [{"id", "verses_count", ...}]}` over HTTP
#[derive(Debug, Clone)]
pub struct HttpChapterProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpChapterProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ChapterMetadataProvider for HttpChapterProvider {
    async fn list_chapters(&self) -> Result<Vec<ChapterInfo>> {
        debug!("Fetching chapter metadata from {}", self.url);
        let response: ChaptersResponse = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.chapters)
    }
}

/// Lazily populated chapter → verse count map
///
/// Populated at most once. A failed population is not remembered, so the
/// next lookup retries the provider.
pub struct ChapterLengths {
    provider: Arc<dyn ChapterMetadataProvider>,
    lengths: OnceCell<HashMap<u16, u16>>,
}

impl ChapterLengths {
    pub fn new(provider: Arc<dyn ChapterMetadataProvider>) -> Self {
        Self {
            provider,
            lengths: OnceCell::new(),
        }
    }

    /// Populate the catalog if needed and return it
    pub async fn ensure_loaded(&self) -> Result<&HashMap<u16, u16>> {
        self.lengths
            .get_or_try_init(|| async {
                let chapters = self.provider.list_chapters().await.map_err(|e| {
                    warn!("Chapter metadata unavailable: {}", e);
                    Error::Metadata(e.to_string())
                })?;
                if chapters.is_empty() {
                    return Err(Error::Metadata("provider returned no chapters".to_string()));
                }
                info!("Loaded verse counts for {} chapters", chapters.len());
                Ok(chapters
                    .into_iter()
                    .map(|c| (c.id, c.verses_count))
                    .collect())
            })
            .await
    }

    /// Verse count of `chapter`; `Ok(None)` for a chapter the catalog lacks
    pub async fn verse_count(&self, chapter: u16) -> Result<Option<u16>> {
        Ok(self.ensure_loaded().await?.get(&chapter).copied())
    }
}
