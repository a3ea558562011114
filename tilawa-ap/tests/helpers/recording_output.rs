//! Recording `AudioOutput` double

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tilawa_ap::audio::{AudioOutput, AudioSource, AudioStatus, LoadId, StatusSender};
use tilawa_ap::{Error, Result};

/// One call the engine made on the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputCall {
    Prepare,
    Load { load_id: LoadId, source: AudioSource },
    Pause,
    Resume,
    Unload,
}

#[derive(Default)]
struct Inner {
    calls: Vec<OutputCall>,
    current: Option<(LoadId, StatusSender)>,
    /// Load in flight or loaded; cleared by `unload`
    wanted: Option<LoadId>,
    fail_next_load: Option<String>,
    load_delay: Option<Duration>,
}

/// Output that plays nothing and remembers everything
#[derive(Default)]
pub struct RecordingOutput {
    inner: Mutex<Inner>,
}

impl RecordingOutput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<OutputCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Every load in order
    pub fn loads(&self) -> Vec<(LoadId, AudioSource)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                OutputCall::Load { load_id, source } => Some((load_id, source)),
                _ => None,
            })
            .collect()
    }

    pub fn last_load(&self) -> Option<(LoadId, AudioSource)> {
        self.loads().pop()
    }

    /// Id of the resource currently loaded
    pub fn current_load_id(&self) -> Option<LoadId> {
        self.inner.lock().unwrap().current.as_ref().map(|(id, _)| *id)
    }

    /// Make the next `load` fail with a decode error
    pub fn fail_next_load(&self, message: &str) {
        self.inner.lock().unwrap().fail_next_load = Some(message.to_string());
    }

    /// Make every `load` take `delay` before the verse is loaded
    pub fn set_load_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().load_delay = Some(delay);
    }

    /// Report the loaded verse as finished on the status channel
    pub fn finish_current(&self) {
        let inner = self.inner.lock().unwrap();
        let (load_id, tx) = inner.current.as_ref().expect("nothing loaded");
        tx.send(AudioStatus::finished(*load_id)).unwrap();
    }
}

#[async_trait]
impl AudioOutput for RecordingOutput {
    async fn prepare(&self) -> Result<()> {
        self.inner.lock().unwrap().calls.push(OutputCall::Prepare);
        Ok(())
    }

    async fn load(&self, load_id: LoadId, source: &AudioSource, status_tx: StatusSender) -> Result<()> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(OutputCall::Load {
                load_id,
                source: source.clone(),
            });
            if let Some(message) = inner.fail_next_load.take() {
                return Err(Error::Decode(message));
            }
            inner.wanted = Some(load_id);
            inner.load_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        // Abandoned if unloaded or replaced while sleeping
        let mut inner = self.inner.lock().unwrap();
        if inner.wanted == Some(load_id) {
            inner.current = Some((load_id, status_tx));
        }
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.inner.lock().unwrap().calls.push(OutputCall::Pause);
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.inner.lock().unwrap().calls.push(OutputCall::Resume);
        Ok(())
    }

    async fn unload(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(OutputCall::Unload);
        inner.wanted = None;
        inner.current = None;
        Ok(())
    }
}
