//! Playback control operations
//!
//! **Responsibilities:**
//! - Starting sessions (play_surah, play_verse)
//! - Pause / resume
//! - Hard and transition stops
//! - Advancing after a verse finishes
//! - Switching reciter mid-session

use super::core::{PlaybackMode, RecitationEngine, SessionGuard};
use crate::playback::sequence::{next_position, Advance};
use crate::reciters::Reciter;
use tilawa_common::events::{PlaybackPosition, StopReason};
use tracing::{debug, info, warn};

impl RecitationEngine {
    /// Recite `chapter` from `start_verse`, continuing verse by verse
    ///
    /// Crosses into the next chapter after the last verse and stops after
    /// the final verse of the final chapter.
    pub async fn play_surah(&self, chapter: u16, start_verse: u16) {
        self.begin(PlaybackPosition::new(chapter, start_verse), PlaybackMode::Sequential)
            .await;
    }

    /// Recite `chapter` from its first verse
    pub async fn play_surah_from_start(&self, chapter: u16) {
        self.play_surah(chapter, 1).await;
    }

    /// Recite a single verse, then stop
    pub async fn play_verse(&self, chapter: u16, verse: u16) {
        self.begin(PlaybackPosition::new(chapter, verse), PlaybackMode::Single)
            .await;
    }

    async fn begin(&self, position: PlaybackPosition, mode: PlaybackMode) {
        if self.current_reciter().is_none() {
            warn!("No reciter selected, ignoring request to play {}", position);
            return;
        }

        let mut session = self.session.lock().await;
        self.stop_before_restart(&mut session).await;
        self.set_mode(mode);
        info!("Starting {:?} playback at {}", mode, position);

        // Warmed alongside the first verse so the first chapter boundary
        // does not wait on it
        let preload = async {
            if mode == PlaybackMode::Sequential {
                if let Err(e) = self.chapter_lengths.ensure_loaded().await {
                    warn!("Chapter lengths unavailable: {}", e);
                }
            }
        };
        tokio::join!(self.start_verse(session, position), preload);
    }

    /// Pause the playing verse, keeping position and mode
    pub async fn pause(&self) {
        let session = self.session.lock().await;
        if session.loading {
            debug!("Pause ignored: verse still loading");
            return;
        }
        if session.loaded.is_none() || !self.is_playing() {
            debug!("Pause ignored: nothing is playing");
            return;
        }

        match self.output.pause().await {
            Ok(()) => {
                self.set_playing(false);
                debug!("Paused at {:?}", self.current_position());
            }
            Err(e) => warn!("Failed to pause audio: {}", e),
        }
    }

    /// Resume the loaded verse, or replay the current position if the audio
    /// was released
    pub async fn resume(&self) {
        let session = self.session.lock().await;
        if session.loading {
            debug!("Resume ignored: verse still loading");
            return;
        }

        if session.loaded.is_some() {
            if self.is_playing() {
                return;
            }
            match self.output.resume().await {
                Ok(()) => {
                    self.set_playing(true);
                    debug!("Resumed at {:?}", self.current_position());
                }
                Err(e) => warn!("Failed to resume audio: {}", e),
            }
            return;
        }

        let Some(position) = self.current_position() else {
            debug!("Resume ignored: nothing to resume");
            return;
        };
        if self.current_reciter().is_none() {
            warn!("No reciter selected, cannot resume {}", position);
            return;
        }

        info!("Replaying {} with the current reciter", position);
        self.start_verse(session, position).await;
    }

    /// Stop playback and clear the position
    ///
    /// Always emits `PositionChanged(None)` once and
    /// `PlaybackStopped { UserStopped }`, even when already idle.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        self.finish_session(&mut session, StopReason::UserStopped)
            .await;
    }

    /// Stop playback ahead of an immediate restart
    ///
    /// Unlike `stop`, listeners are not told the position was cleared.
    pub async fn stop_for_transition(&self) {
        let mut session = self.session.lock().await;
        self.stop_before_restart(&mut session).await;
    }

    /// Change reciter and continue from the same verse with the new voice
    ///
    /// Captures the position and mode, pauses, selects `reciter`, then
    /// replays the captured verse in the captured mode. Without a position
    /// this is just a reciter change.
    pub async fn switch_reciter(&self, reciter: Reciter) {
        let position = self.current_position();
        let mode = self.mode();

        self.pause().await;
        self.set_reciter(Some(reciter)).await;

        let Some(position) = position else {
            return;
        };
        match mode {
            PlaybackMode::Sequential => self.play_surah(position.chapter, position.verse).await,
            PlaybackMode::Single => self.play_verse(position.chapter, position.verse).await,
        }
    }

    /// Move on after the current verse played to its end
    pub(super) async fn advance(&self, mut session: SessionGuard<'_>) {
        let Some(current) = self.current_position() else {
            self.finish_session(&mut session, StopReason::Completed).await;
            return;
        };

        if self.mode() == PlaybackMode::Single {
            debug!("Verse {} finished", current);
            self.finish_session(&mut session, StopReason::Completed).await;
            return;
        }

        // A lookup that misses the preload may go to the network
        let finished = session.loaded;
        drop(session);
        let lookup = self.chapter_lengths.verse_count(current.chapter).await;
        let mut session = self.session.lock().await;
        if session.loaded != finished {
            debug!("Session changed while looking up chapter {}", current.chapter);
            return;
        }

        let verse_count = match lookup {
            Ok(Some(count)) => count,
            Ok(None) => {
                warn!("No verse count known for chapter {}", current.chapter);
                self.finish_session(&mut session, StopReason::MetadataUnavailable)
                    .await;
                return;
            }
            Err(e) => {
                warn!("Cannot advance past {}: {}", current, e);
                self.finish_session(&mut session, StopReason::MetadataUnavailable)
                    .await;
                return;
            }
        };

        match next_position(current, verse_count) {
            Advance::Next(next) => {
                debug!("Verse {} finished, advancing to {}", current, next);
                self.start_verse(session, next).await;
            }
            Advance::EndOfCorpus => {
                self.finish_session(&mut session, StopReason::CompletedCorpus)
                    .await;
            }
        }
    }
}
