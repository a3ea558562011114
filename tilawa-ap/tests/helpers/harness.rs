//! Engine test harness

use super::recording_output::RecordingOutput;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tilawa_ap::cache::AudioCache;
use tilawa_ap::chapters::{BuiltinChapters, ChapterInfo, ChapterMetadataProvider};
use tilawa_ap::db::{init_schema, SettingsStore, SqliteSettings};
use tilawa_ap::playback::{EngineComponents, RecitationEngine};
use tilawa_ap::reciters::{Reciter, ReciterCatalog};
use tilawa_ap::{Error, Result};
use tilawa_common::events::{EventBus, PlaybackPosition, StopReason, TilawaEvent};
use tokio::sync::broadcast;

/// Chapter provider that is always offline
pub struct UnavailableChapters;

#[async_trait]
impl ChapterMetadataProvider for UnavailableChapters {
    async fn list_chapters(&self) -> Result<Vec<ChapterInfo>> {
        Err(Error::Metadata("offline".to_string()))
    }
}

/// alpha, beta, and a reciter without a base URL
pub fn test_catalog() -> ReciterCatalog {
    ReciterCatalog::new(vec![
        Reciter::new("alpha", "Alpha", "https://alpha.example/audio/"),
        Reciter::new("beta", "Beta", "https://beta.example/audio/"),
        Reciter::new("broken", "Broken", ""),
    ])
}

pub async fn memory_settings() -> Arc<SqliteSettings> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    Arc::new(SqliteSettings::new(pool))
}

/// Builds engines sharing one settings store
pub struct EngineBuilder {
    pub settings: Arc<SqliteSettings>,
    pub chapters: Arc<dyn ChapterMetadataProvider>,
}

impl EngineBuilder {
    pub async fn new() -> Self {
        Self {
            settings: memory_settings().await,
            chapters: Arc::new(BuiltinChapters),
        }
    }

    pub fn with_chapters(mut self, chapters: Arc<dyn ChapterMetadataProvider>) -> Self {
        self.chapters = chapters;
        self
    }

    /// Build and initialize an engine using `cache_root`
    pub async fn build(&self, cache_root: &Path) -> (Arc<RecitationEngine>, Arc<RecordingOutput>) {
        let output = RecordingOutput::new();
        let settings: Arc<dyn SettingsStore> = self.settings.clone();
        let engine = RecitationEngine::new(EngineComponents {
            catalog: test_catalog(),
            settings,
            chapters: Arc::clone(&self.chapters),
            cache: AudioCache::new(cache_root),
            output: output.clone(),
            events: EventBus::new(256),
        });
        engine.initialize().await;
        (engine, output)
    }
}

/// Initialized engine plus everything a test inspects
pub struct TestEngine {
    pub engine: Arc<RecitationEngine>,
    pub output: Arc<RecordingOutput>,
    pub settings: Arc<SqliteSettings>,
    pub cache: AudioCache,
    pub events: broadcast::Receiver<TilawaEvent>,
    _cache_dir: TempDir,
}

impl TestEngine {
    pub async fn new() -> Self {
        Self::with_builder(EngineBuilder::new().await).await
    }

    pub async fn with_builder(builder: EngineBuilder) -> Self {
        let cache_dir = tempfile::tempdir().unwrap();
        let (engine, output) = builder.build(cache_dir.path()).await;
        let events = engine.subscribe();
        Self {
            engine,
            output,
            settings: builder.settings,
            cache: AudioCache::new(cache_dir.path()),
            events,
            _cache_dir: cache_dir,
        }
    }

    /// Events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<TilawaEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Put a verse file into the cache
    pub async fn cache_verse(&self, reciter_id: &str, chapter: u16, verse: u16) {
        let path = self.cache.verse_path(reciter_id, chapter, verse);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"mp3").await.unwrap();
    }

    /// Report the loaded verse as finished, bypassing the status channel
    pub async fn finish_current(&self) {
        let load_id = self.output.current_load_id().expect("nothing loaded");
        self.engine
            .handle_status(tilawa_ap::audio::AudioStatus::finished(load_id))
            .await;
    }
}

/// Positions announced by `PositionChanged` events, in order
pub fn positions(events: &[TilawaEvent]) -> Vec<Option<PlaybackPosition>> {
    events
        .iter()
        .filter_map(|event| match event {
            TilawaEvent::PositionChanged { position, .. } => Some(*position),
            _ => None,
        })
        .collect()
}

/// Reasons of `PlaybackStopped` events, in order
pub fn stop_reasons(events: &[TilawaEvent]) -> Vec<StopReason> {
    events
        .iter()
        .filter_map(|event| match event {
            TilawaEvent::PlaybackStopped { reason, .. } => Some(reason.clone()),
            _ => None,
        })
        .collect()
}
