//! Event types for the Tilawa event system
//!
//! Provides shared event definitions and the EventBus used by the playback
//! engine, the SSE endpoint and in-process listeners.

mod playback_types;

pub use playback_types::{PlaybackPosition, StopReason};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Tilawa event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TilawaEvent {
    /// Loaded verse changed
    ///
    /// Emitted before the verse audio starts loading. `None` means the
    /// "now playing" indicator should be cleared. Not emitted when audio is
    /// unloaded only to make room for another verse.
    PositionChanged {
        position: Option<PlaybackPosition>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Underlying audio switched between playing and not playing
    ///
    /// Only emitted on an actual transition.
    PlayingStateChanged {
        is_playing: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback session ended
    PlaybackStopped {
        reason: StopReason,
        /// Position that was loaded when the session ended
        position: Option<PlaybackPosition>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Current reciter selection changed
    ReciterChanged {
        reciter_id: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Offline download of a chapter advanced by one verse
    DownloadProgress {
        reciter_id: String,
        chapter: u16,
        completed: u16,
        total: u16,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl TilawaEvent {
    /// Get event type as string for filtering and SSE event names
    pub fn event_type(&self) -> &'static str {
        match self {
            TilawaEvent::PositionChanged { .. } => "PositionChanged",
            TilawaEvent::PlayingStateChanged { .. } => "PlayingStateChanged",
            TilawaEvent::PlaybackStopped { .. } => "PlaybackStopped",
            TilawaEvent::ReciterChanged { .. } => "ReciterChanged",
            TilawaEvent::DownloadProgress { .. } => "DownloadProgress",
        }
    }

    pub fn position_changed(position: Option<PlaybackPosition>) -> Self {
        TilawaEvent::PositionChanged {
            position,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn playing_state_changed(is_playing: bool) -> Self {
        TilawaEvent::PlayingStateChanged {
            is_playing,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn playback_stopped(reason: StopReason, position: Option<PlaybackPosition>) -> Self {
        TilawaEvent::PlaybackStopped {
            reason,
            position,
            timestamp: chrono::Utc::now(),
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use tilawa_common::events::{EventBus, TilawaEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(TilawaEvent::playing_state_changed(true));
///
/// match rx.try_recv() {
///     Ok(TilawaEvent::PlayingStateChanged { is_playing, .. }) => assert!(is_playing),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TilawaEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before
    /// the oldest ones are dropped.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TilawaEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: TilawaEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        assert_eq!(
            TilawaEvent::position_changed(None).event_type(),
            "PositionChanged"
        );
        assert_eq!(
            TilawaEvent::playing_state_changed(false).event_type(),
            "PlayingStateChanged"
        );
        assert_eq!(
            TilawaEvent::playback_stopped(StopReason::UserStopped, None).event_type(),
            "PlaybackStopped"
        );
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = TilawaEvent::position_changed(Some(PlaybackPosition::new(18, 10)));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "PositionChanged");
        assert_eq!(json["position"]["chapter"], 18);
        assert_eq!(json["position"]["verse"], 10);

        let cleared = serde_json::to_value(TilawaEvent::position_changed(None)).unwrap();
        assert!(cleared["position"].is_null());
    }

    #[test]
    fn test_eventbus_emit_without_subscribers() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit_lossy(TilawaEvent::playing_state_changed(true));

        // Events sent before subscribing are not delivered
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit_lossy(TilawaEvent::position_changed(None));

        assert!(matches!(rx1.try_recv(), Ok(TilawaEvent::PositionChanged { .. })));
        assert!(matches!(rx2.try_recv(), Ok(TilawaEvent::PositionChanged { .. })));
    }

    #[test]
    fn test_eventbus_emit_lossy_on_full_channel() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for _ in 0..10 {
            bus.emit_lossy(TilawaEvent::playing_state_changed(true));
        }

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(8))
        ));
    }
}
