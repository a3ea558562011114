//! Core recitation engine - state, lifecycle and status handling
//!
//! **Responsibilities:**
//! - RecitationEngine struct definition and construction
//! - Startup (initialize, start) and the device status listener
//! - Session bookkeeping shared by the playback operations (load, finish)
//! - Synchronous state queries and listener registration
//!
//! Mutating operations serialize through `session`, an async mutex held
//! across device calls except `load`: the lock is released while a verse
//! loads so stop and pause stay responsive, and the load result is dropped
//! if the session moved on meanwhile. Queries read `state`, a snapshot
//! behind a std `RwLock` that is only ever held for a copy, never across an
//! await.

use crate::audio::{AudioOutput, AudioStatus, LoadId, StatusReceiver, StatusSender};
use crate::cache::AudioCache;
use crate::chapters::{ChapterLengths, ChapterMetadataProvider};
use crate::db::settings::{load_selected_reciter, SettingsStore};
use crate::playback::listeners::{spawn_listener, ListenerHandle};
use crate::playback::source::resolve_source;
use crate::reciters::{Reciter, ReciterCatalog};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tilawa_common::events::{EventBus, PlaybackPosition, StopReason, TilawaEvent};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// How a session continues after a verse finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Stop after the current verse
    #[default]
    Single,
    /// Continue through the chapter and into the next ones
    Sequential,
}

/// Snapshot of the engine for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub position: Option<PlaybackPosition>,
    pub is_playing: bool,
    pub mode: PlaybackMode,
    pub reciter_id: Option<String>,
}

/// Collaborators handed to the engine at construction
pub struct EngineComponents {
    pub catalog: ReciterCatalog,
    pub settings: Arc<dyn SettingsStore>,
    pub chapters: Arc<dyn ChapterMetadataProvider>,
    pub cache: AudioCache,
    pub output: Arc<dyn AudioOutput>,
    pub events: EventBus,
}

/// State owned by the mutating operations
#[derive(Debug, Default)]
pub(super) struct Session {
    /// Id of the resource currently held (or being loaded) by the output
    pub(super) loaded: Option<LoadId>,
    /// `loaded` has not finished loading yet
    pub(super) loading: bool,
}

pub(super) type SessionGuard<'a> = tokio::sync::MutexGuard<'a, Session>;

/// State readable without awaiting
#[derive(Debug, Default)]
pub(super) struct EngineState {
    pub(super) reciter: Option<Reciter>,
    pub(super) position: Option<PlaybackPosition>,
    pub(super) is_playing: bool,
    pub(super) mode: PlaybackMode,
}

/// Sequential recitation playback engine
///
/// Constructed once at startup and shared as `Arc<RecitationEngine>`.
/// Public operations never return errors: failures are logged and turn
/// into a stopped session with a `PlaybackStopped` event naming the reason.
pub struct RecitationEngine {
    pub(super) catalog: ReciterCatalog,
    pub(super) settings: Arc<dyn SettingsStore>,
    pub(super) chapter_lengths: ChapterLengths,
    pub(super) cache: AudioCache,
    pub(super) output: Arc<dyn AudioOutput>,
    pub(super) events: EventBus,

    pub(super) session: tokio::sync::Mutex<Session>,
    state: RwLock<EngineState>,
    next_load_id: AtomicU64,

    status_tx: StatusSender,
    /// Taken by `start`
    status_rx: Mutex<Option<StatusReceiver>>,
}

impl RecitationEngine {
    pub fn new(components: EngineComponents) -> Arc<Self> {
        let (status_tx, status_rx) = crate::audio::status_channel();
        Arc::new(Self {
            catalog: components.catalog,
            settings: components.settings,
            chapter_lengths: ChapterLengths::new(components.chapters),
            cache: components.cache,
            output: components.output,
            events: components.events,
            session: tokio::sync::Mutex::new(Session::default()),
            state: RwLock::new(EngineState::default()),
            next_load_id: AtomicU64::new(0),
            status_tx,
            status_rx: Mutex::new(Some(status_rx)),
        })
    }

    /// Prepare the output, create the cache root and restore the reciter
    ///
    /// The persisted reciter is used if it is still in the catalog, else the
    /// first catalog entry. Every failure here is logged and skipped.
    pub async fn initialize(&self) {
        if let Err(e) = self.output.prepare().await {
            warn!("Audio output preparation failed: {}", e);
        }

        if let Err(e) = self.cache.ensure_root().await {
            warn!(
                "Failed to create audio cache at {}: {}",
                self.cache.root().display(),
                e
            );
        }

        let persisted = match load_selected_reciter(self.settings.as_ref()).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to load persisted reciter: {}", e);
                None
            }
        };

        let restored = persisted.and_then(|id| {
            let found = self.catalog.find(&id).cloned();
            if found.is_none() {
                warn!("Persisted reciter '{}' is not in the catalog", id);
            }
            found
        });
        let reciter = restored.or_else(|| self.catalog.default_reciter().cloned());

        match &reciter {
            Some(r) => info!("Current reciter: {} ({})", r.name, r.id),
            None => warn!("No reciter available; playback requests will be ignored"),
        }
        self.write_state().reciter = reciter;
    }

    /// Spawn the device status listener
    ///
    /// The task holds a weak reference and exits once the engine is dropped.
    /// Calling `start` twice is a no-op.
    pub fn start(self: &Arc<Self>) {
        let rx = self
            .status_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut rx) = rx else {
            warn!("Recitation engine already started");
            return;
        };

        let engine = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(status) = rx.recv().await {
                let Some(engine) = engine.upgrade() else {
                    break;
                };
                engine.handle_status(status).await;
            }
            debug!("Status listener exited");
        });
        info!("Recitation engine started");
    }

    /// Apply a status update from the output
    ///
    /// Updates for any resource other than the one currently loaded are
    /// ignored, so late reports from an unloaded verse cannot advance or
    /// stop the current session.
    pub async fn handle_status(&self, status: AudioStatus) {
        let mut session = self.session.lock().await;
        if session.loaded != Some(status.load_id) {
            debug!(
                "Ignoring status for stale load {} (current {:?})",
                status.load_id, session.loaded
            );
            return;
        }

        if let Some(message) = status.error {
            error!("Playback failed: {}", message);
            self.finish_session(&mut session, StopReason::PlaybackError { message })
                .await;
            return;
        }

        if status.did_just_finish {
            self.advance(session).await;
            return;
        }

        if !status.is_loaded {
            // Position is kept so `resume` can replay the verse
            warn!("Output released load {}", status.load_id);
            session.loaded = None;
            session.loading = false;
            self.set_playing(false);
            return;
        }

        self.set_playing(status.is_playing);
    }

    // ========================================
    // Queries
    // ========================================

    pub fn is_playing(&self) -> bool {
        self.read_state().is_playing
    }

    pub fn current_position(&self) -> Option<PlaybackPosition> {
        self.read_state().position
    }

    pub fn current_reciter(&self) -> Option<Reciter> {
        self.read_state().reciter.clone()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.read_state().mode
    }

    pub fn status(&self) -> EngineStatus {
        let state = self.read_state();
        EngineStatus {
            position: state.position,
            is_playing: state.is_playing,
            mode: state.mode,
            reciter_id: state.reciter.as_ref().map(|r| r.id.clone()),
        }
    }

    /// Raw event stream
    pub fn subscribe(&self) -> broadcast::Receiver<TilawaEvent> {
        self.events.subscribe()
    }

    // ========================================
    // Listeners
    // ========================================

    /// Call `callback` with every position change; `None` clears "now playing"
    pub fn on_verse_change<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(Option<PlaybackPosition>) + Send + 'static,
    {
        spawn_listener(&self.events, move |event| {
            if let TilawaEvent::PositionChanged { position, .. } = event {
                callback(*position);
            }
        })
    }

    /// Call `callback` whenever audio starts or stops playing
    pub fn on_playback_state_change<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(bool) + Send + 'static,
    {
        spawn_listener(&self.events, move |event| {
            if let TilawaEvent::PlayingStateChanged { is_playing, .. } = event {
                callback(*is_playing);
            }
        })
    }

    // ========================================
    // Session helpers (callers hold `session`)
    // ========================================

    /// Announce `position`, then resolve and load it
    ///
    /// Resolution reads the reciter current at this moment. Any previously
    /// loaded resource is released first. Consumes the session guard: the
    /// lock is dropped while the output loads and re-taken afterwards.
    pub(super) async fn start_verse(&self, mut session: SessionGuard<'_>, position: PlaybackPosition) {
        self.release(&mut session).await;

        self.write_state().position = Some(position);
        self.events
            .emit_lossy(TilawaEvent::position_changed(Some(position)));

        let reciter = self.current_reciter();
        let source = match resolve_source(&self.cache, reciter.as_ref(), position).await {
            Ok(source) => source,
            Err(e) => {
                error!("Cannot resolve audio for {}: {}", position, e);
                self.finish_session(
                    &mut session,
                    StopReason::ResolutionError {
                        message: e.to_string(),
                    },
                )
                .await;
                return;
            }
        };

        let load_id = self.next_load_id.fetch_add(1, Ordering::SeqCst) + 1;
        session.loaded = Some(load_id);
        session.loading = true;
        debug!("Loading {} from {} (load {})", position, source, load_id);
        drop(session);

        let result = self
            .output
            .load(load_id, &source, self.status_tx.clone())
            .await;

        let mut session = self.session.lock().await;
        if session.loaded != Some(load_id) {
            debug!("Load {} superseded while loading", load_id);
            return;
        }
        session.loading = false;

        if let Err(e) = result {
            error!("Failed to play {}: {}", position, e);
            self.finish_session(
                &mut session,
                StopReason::PlaybackError {
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }

        self.set_playing(true);
    }

    /// End the session: clear position and tell listeners why
    pub(super) async fn finish_session(&self, session: &mut Session, reason: StopReason) {
        let position = self.current_position();
        self.release(session).await;

        {
            let mut state = self.write_state();
            state.mode = PlaybackMode::Single;
            state.position = None;
        }
        self.set_playing(false);

        if reason.is_failure() {
            warn!("Playback stopped at {:?}: {}", position, reason);
        } else {
            info!("Playback stopped at {:?}: {}", position, reason);
        }

        self.events.emit_lossy(TilawaEvent::position_changed(None));
        self.events
            .emit_lossy(TilawaEvent::playback_stopped(reason, position));
    }

    /// Stop ahead of a new load: same as a finish but listeners are not told
    /// the position was cleared
    pub(super) async fn stop_before_restart(&self, session: &mut Session) {
        self.release(session).await;
        {
            let mut state = self.write_state();
            state.mode = PlaybackMode::Single;
            state.position = None;
        }
        self.set_playing(false);
    }

    /// Unload the current resource if there is one
    async fn release(&self, session: &mut Session) {
        session.loading = false;
        if let Some(load_id) = session.loaded.take() {
            debug!("Unloading load {}", load_id);
            if let Err(e) = self.output.unload().await {
                warn!("Failed to unload audio: {}", e);
            }
        }
    }

    pub(super) fn set_mode(&self, mode: PlaybackMode) {
        self.write_state().mode = mode;
    }

    /// Record the playing flag, emitting only on an actual change
    pub(super) fn set_playing(&self, is_playing: bool) {
        let changed = {
            let mut state = self.write_state();
            let changed = state.is_playing != is_playing;
            state.is_playing = is_playing;
            changed
        };
        if changed {
            self.events
                .emit_lossy(TilawaEvent::playing_state_changed(is_playing));
        }
    }

    pub(super) fn set_current_reciter(&self, reciter: Option<Reciter>) {
        self.write_state().reciter = reciter;
    }

    fn read_state(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
