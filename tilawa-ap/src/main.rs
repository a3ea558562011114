//! Tilawa Audio Player (tilawa-ap) - Main entry point
//!
//! Sequential Quran recitation playback service with an HTTP/SSE control
//! interface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tilawa_ap::audio::DeviceOutput;
use tilawa_ap::cache::AudioCache;
use tilawa_ap::chapters::{BuiltinChapters, ChapterMetadataProvider, HttpChapterProvider};
use tilawa_ap::config::{Config, TomlConfig};
use tilawa_ap::db::{self, SqliteSettings};
use tilawa_ap::playback::{EngineComponents, RecitationEngine};
use tilawa_ap::reciters::ReciterCatalog;
use tilawa_common::events::EventBus;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Events buffered per subscriber before slow ones start lagging
const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for tilawa-ap
#[derive(Parser, Debug)]
#[command(name = "tilawa-ap")]
#[command(about = "Sequential Quran recitation player")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "TILAWA_AP_PORT")]
    port: Option<u16>,

    /// Root folder for the settings database and audio cache
    /// (TILAWA_ROOT_FOLDER is used when absent)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration file")?;

    // Initialize tracing; RUST_LOG wins over the config file level
    let level = &toml_config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tilawa_ap={0},tilawa_common={0},tower_http={0}", level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::resolve(
        &toml_config,
        args.config.as_deref(),
        args.root_folder.as_deref(),
        args.port,
    )
    .context("Failed to resolve configuration")?;

    info!("Starting Tilawa Audio Player on port {}", config.port);
    info!("Root folder: {}", config.root_folder.display());

    let pool = db::connect(&config.db_path)
        .await
        .context("Failed to open settings database")?;

    let client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let chapters: Arc<dyn ChapterMetadataProvider> = match &config.chapters_url {
        Some(url) => {
            info!("Chapter metadata from {}", url);
            Arc::new(HttpChapterProvider::with_client(client.clone(), url.clone()))
        }
        None => Arc::new(BuiltinChapters),
    };

    let engine = RecitationEngine::new(EngineComponents {
        catalog: ReciterCatalog::builtin(),
        settings: Arc::new(SqliteSettings::new(pool)),
        chapters,
        cache: AudioCache::with_client(config.cache_root.clone(), client.clone()),
        output: Arc::new(DeviceOutput::new(None, client)),
        events: EventBus::new(EVENT_BUS_CAPACITY),
    });

    engine.initialize().await;
    engine.start();
    info!("Recitation engine initialized");

    tilawa_ap::api::run(config.port, Arc::clone(&engine))
        .await
        .context("Server error")?;

    engine.stop().await;
    Ok(())
}
