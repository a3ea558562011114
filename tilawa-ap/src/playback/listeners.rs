//! In-process event listeners
//!
//! Each listener is a task draining its own `EventBus` subscription. The
//! returned handle owns the task: dropping or cancelling it unsubscribes.

use tilawa_common::events::{EventBus, TilawaEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Registration of an engine listener
#[must_use = "dropping the handle unsubscribes the listener"]
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Unsubscribe now
    pub fn cancel(self) {}

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run `on_event` for every event emitted after this call
///
/// Subscribes before returning, so nothing emitted after registration is
/// missed. Must be called within a tokio runtime.
pub(crate) fn spawn_listener<F>(events: &EventBus, mut on_event: F) -> ListenerHandle
where
    F: FnMut(&TilawaEvent) + Send + 'static,
{
    let mut rx = events.subscribe();
    let task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => on_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Listener lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("Event bus closed, listener exiting");
                    break;
                }
            }
        }
    });
    ListenerHandle { task }
}
