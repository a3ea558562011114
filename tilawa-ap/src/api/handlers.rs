//! HTTP request handlers

use crate::api::server::AppContext;
use crate::audio::DeviceOutput;
use crate::cache::DownloadSummary;
use crate::chapters::FINAL_CHAPTER;
use crate::error::Error;
use crate::playback::EngineStatus;
use crate::reciters::Reciter;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct ReciterListResponse {
    reciters: Vec<Reciter>,
}

#[derive(Debug, Serialize)]
pub struct ReciterResponse {
    reciter: Option<Reciter>,
}

#[derive(Debug, Deserialize)]
pub struct SetReciterRequest {
    reciter_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SwitchReciterRequest {
    reciter_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaySurahRequest {
    chapter: u16,
    /// First verse, 1 when omitted
    verse: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PlayVerseRequest {
    chapter: u16,
    verse: u16,
}

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    devices: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SurahCacheResponse {
    reciter_id: String,
    chapter: u16,
    downloaded: bool,
}

type ApiError = (StatusCode, Json<StatusResponse>);
type ApiResult<T> = Result<T, ApiError>;

fn api_error(code: StatusCode, message: impl Into<String>) -> ApiError {
    (
        code,
        Json(StatusResponse {
            status: format!("error: {}", message.into()),
        }),
    )
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let code = match &e {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidState(_) => StatusCode::CONFLICT,
            Error::Http(_) | Error::Metadata(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if code.is_server_error() {
            error!("Request failed: {}", e);
        }
        api_error(code, e.to_string())
    }
}

fn validate_chapter(chapter: u16) -> ApiResult<()> {
    if chapter == 0 || chapter > FINAL_CHAPTER {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("chapter must be between 1 and {}", FINAL_CHAPTER),
        ));
    }
    Ok(())
}

fn validate_verse(verse: u16) -> ApiResult<()> {
    if verse == 0 {
        return Err(api_error(StatusCode::BAD_REQUEST, "verse must be at least 1"));
    }
    Ok(())
}

fn require_reciter(ctx: &AppContext) -> ApiResult<()> {
    if ctx.engine.current_reciter().is_none() {
        return Err(api_error(StatusCode::CONFLICT, "no reciter selected"));
    }
    Ok(())
}

fn find_reciter(ctx: &AppContext, id: &str) -> ApiResult<Reciter> {
    ctx.engine
        .find_reciter(id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown reciter '{}'", id)))
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "tilawa-ap".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Audio Device Endpoints
// ============================================================================

/// GET /audio/devices - List available audio output devices
pub async fn list_audio_devices() -> ApiResult<Json<DeviceListResponse>> {
    let devices = tokio::task::spawn_blocking(DeviceOutput::list_devices)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;
    info!("Found {} audio devices", devices.len());
    Ok(Json(DeviceListResponse { devices }))
}

// ============================================================================
// Reciter Endpoints
// ============================================================================

/// GET /reciters - Reciter catalog
pub async fn list_reciters(State(ctx): State<AppContext>) -> Json<ReciterListResponse> {
    Json(ReciterListResponse {
        reciters: ctx.engine.list_reciters().to_vec(),
    })
}

/// GET /reciter - Current reciter
pub async fn get_reciter(State(ctx): State<AppContext>) -> Json<ReciterResponse> {
    Json(ReciterResponse {
        reciter: ctx.engine.current_reciter(),
    })
}

/// POST /reciter - Select a reciter (`null` clears the selection)
///
/// Does not touch playback; use `/reciter/switch` to re-recite the current
/// verse with the new voice.
pub async fn set_reciter(
    State(ctx): State<AppContext>,
    Json(req): Json<SetReciterRequest>,
) -> ApiResult<Json<ReciterResponse>> {
    let reciter = match req.reciter_id.as_deref() {
        Some(id) => Some(find_reciter(&ctx, id)?),
        None => None,
    };

    ctx.engine.set_reciter(reciter).await;
    Ok(Json(ReciterResponse {
        reciter: ctx.engine.current_reciter(),
    }))
}

/// POST /reciter/switch - Change reciter and continue from the same verse
pub async fn switch_reciter(
    State(ctx): State<AppContext>,
    Json(req): Json<SwitchReciterRequest>,
) -> ApiResult<Json<EngineStatus>> {
    let reciter = find_reciter(&ctx, &req.reciter_id)?;
    info!("Switching reciter to {}", reciter.id);
    ctx.engine.switch_reciter(reciter).await;
    Ok(Json(ctx.engine.status()))
}

// ============================================================================
// Playback Endpoints
// ============================================================================

/// POST /playback/surah - Recite a chapter verse by verse
pub async fn play_surah(
    State(ctx): State<AppContext>,
    Json(req): Json<PlaySurahRequest>,
) -> ApiResult<Json<EngineStatus>> {
    validate_chapter(req.chapter)?;
    if let Some(verse) = req.verse {
        validate_verse(verse)?;
    }
    require_reciter(&ctx)?;

    match req.verse {
        Some(verse) => ctx.engine.play_surah(req.chapter, verse).await,
        None => ctx.engine.play_surah_from_start(req.chapter).await,
    }
    Ok(Json(ctx.engine.status()))
}

/// POST /playback/verse - Recite one verse
pub async fn play_verse(
    State(ctx): State<AppContext>,
    Json(req): Json<PlayVerseRequest>,
) -> ApiResult<Json<EngineStatus>> {
    validate_chapter(req.chapter)?;
    validate_verse(req.verse)?;
    require_reciter(&ctx)?;

    ctx.engine.play_verse(req.chapter, req.verse).await;
    Ok(Json(ctx.engine.status()))
}

/// POST /playback/pause
pub async fn pause(State(ctx): State<AppContext>) -> Json<EngineStatus> {
    ctx.engine.pause().await;
    Json(ctx.engine.status())
}

/// POST /playback/resume
pub async fn resume(State(ctx): State<AppContext>) -> Json<EngineStatus> {
    ctx.engine.resume().await;
    Json(ctx.engine.status())
}

/// POST /playback/stop
pub async fn stop(State(ctx): State<AppContext>) -> Json<EngineStatus> {
    ctx.engine.stop().await;
    Json(ctx.engine.status())
}

/// GET /playback/status
pub async fn get_status(State(ctx): State<AppContext>) -> Json<EngineStatus> {
    Json(ctx.engine.status())
}

// ============================================================================
// Cache Endpoints
// ============================================================================

/// GET /cache/surah/:chapter - Whether the chapter is cached for the current reciter
pub async fn get_surah_cache(
    State(ctx): State<AppContext>,
    Path(chapter): Path<u16>,
) -> ApiResult<Json<SurahCacheResponse>> {
    validate_chapter(chapter)?;
    let reciter = ctx
        .engine
        .current_reciter()
        .ok_or_else(|| api_error(StatusCode::CONFLICT, "no reciter selected"))?;

    let downloaded = ctx.engine.is_surah_downloaded(chapter).await?;
    Ok(Json(SurahCacheResponse {
        reciter_id: reciter.id,
        chapter,
        downloaded,
    }))
}

/// POST /cache/surah/:chapter - Download the chapter for the current reciter
pub async fn download_surah(
    State(ctx): State<AppContext>,
    Path(chapter): Path<u16>,
) -> ApiResult<Json<DownloadSummary>> {
    validate_chapter(chapter)?;
    let summary = ctx.engine.download_surah(chapter).await.map_err(|e| {
        warn!("Download of chapter {} failed: {}", chapter, e);
        e
    })?;
    Ok(Json(summary))
}

/// DELETE /cache/surah/:chapter - Remove the chapter's cached audio
pub async fn remove_surah(
    State(ctx): State<AppContext>,
    Path(chapter): Path<u16>,
) -> ApiResult<StatusCode> {
    validate_chapter(chapter)?;
    ctx.engine.remove_surah(chapter).await?;
    Ok(StatusCode::NO_CONTENT)
}
