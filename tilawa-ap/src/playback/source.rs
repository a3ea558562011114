//! Verse audio source resolution
//!
//! The local cache wins over the network; the remote URL is
//! `<base_url><chapter:03><verse:03><suffix>`.

use crate::audio::AudioSource;
use crate::cache::AudioCache;
use crate::error::{Error, Result};
use crate::reciters::Reciter;
use tilawa_common::events::PlaybackPosition;
use tracing::debug;

fn check_position(position: PlaybackPosition) -> Result<()> {
    if position.chapter == 0 || position.verse == 0 {
        return Err(Error::Resolution(format!(
            "invalid verse reference {}",
            position
        )));
    }
    Ok(())
}

/// Remote archive URL of one verse
pub fn remote_url(reciter: &Reciter, position: PlaybackPosition) -> Result<String> {
    check_position(position)?;
    if reciter.base_url.trim().is_empty() {
        return Err(Error::Resolution(format!(
            "reciter '{}' has no base URL",
            reciter.id
        )));
    }

    Ok(format!(
        "{}{:03}{:03}{}",
        reciter.base_url,
        position.chapter,
        position.verse,
        reciter.suffix()
    ))
}

/// Pick the playable source for `position` under `reciter`
pub async fn resolve_source(
    cache: &AudioCache,
    reciter: Option<&Reciter>,
    position: PlaybackPosition,
) -> Result<AudioSource> {
    let reciter = reciter.ok_or_else(|| Error::Resolution("no reciter selected".to_string()))?;
    check_position(position)?;

    let local = cache.verse_path(&reciter.id, position.chapter, position.verse);
    if cache.exists(&local).await {
        debug!("Resolved {} to cached file {}", position, local.display());
        return Ok(AudioSource::LocalFile(local));
    }

    let url = remote_url(reciter, position)?;
    debug!("Resolved {} to {}", position, url);
    Ok(AudioSource::RemoteUrl(url))
}
