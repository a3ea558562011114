//! Audio output using cpal
//!
//! One verse plays at a time. `load` fetches and decodes the file, then
//! hands the samples to a dedicated audio thread that owns the cpal stream
//! (streams are not `Send` on every host). The thread reports the natural
//! end of the verse on the status channel, and the release of the verse
//! when it exits.

use crate::audio::decoder::{DecodedAudio, SimpleDecoder};
use crate::audio::output::AudioOutput;
use crate::audio::resampler::{remix_channels, Resampler};
use crate::audio::types::{AudioSource, AudioStatus, LoadId, StatusSender};
use crate::error::{Error, Result};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

/// How often the audio thread checks for end of stream
const FINISH_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared state between the audio callback and the controlling side
struct PlaybackControl {
    /// Interleaved samples already in device rate and channel layout
    samples: Vec<f32>,
    cursor: AtomicUsize,
    paused: AtomicBool,
    finished: AtomicBool,
}

impl PlaybackControl {
    fn new(samples: Vec<f32>) -> Self {
        let finished = samples.is_empty();
        Self {
            samples,
            cursor: AtomicUsize::new(0),
            paused: AtomicBool::new(false),
            finished: AtomicBool::new(finished),
        }
    }

    /// Audio callback body: copy the next samples or silence
    fn fill<T>(&self, data: &mut [T])
    where
        T: Sample + FromSample<f32>,
    {
        if self.paused.load(Ordering::Acquire) || self.finished.load(Ordering::Acquire) {
            data.fill(T::EQUILIBRIUM);
            return;
        }

        let start = self.cursor.load(Ordering::Relaxed);
        let end = (start + data.len()).min(self.samples.len());
        let written = end - start;

        for (out, &sample) in data.iter_mut().zip(&self.samples[start..end]) {
            *out = T::from_sample(sample.clamp(-1.0, 1.0));
        }
        data[written..].fill(T::EQUILIBRIUM);

        self.cursor.store(end, Ordering::Relaxed);
        if end >= self.samples.len() {
            self.finished.store(true, Ordering::Release);
        }
    }
}

/// The currently loaded verse
struct ActiveVoice {
    load_id: LoadId,
    control: Arc<PlaybackControl>,
    status_tx: StatusSender,
    stop_tx: std_mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

/// `AudioOutput` playing through the system audio device
pub struct DeviceOutput {
    /// Requested device name (None = default device)
    device_name: Option<String>,
    client: reqwest::Client,
    active: Mutex<Option<ActiveVoice>>,
    /// Most recently requested load, 0 after `unload`
    wanted: AtomicU64,
}

impl DeviceOutput {
    pub fn new(device_name: Option<String>, client: reqwest::Client) -> Self {
        Self {
            device_name,
            client,
            active: Mutex::new(None),
            wanted: AtomicU64::new(0),
        }
    }

    fn is_wanted(&self, load_id: LoadId) -> bool {
        self.wanted.load(Ordering::Acquire) == load_id
    }

    /// List available audio output devices
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    async fn fetch(&self, source: &AudioSource) -> Result<Vec<u8>> {
        match source {
            AudioSource::LocalFile(path) => Ok(tokio::fs::read(path).await?),
            AudioSource::RemoteUrl(url) => {
                let bytes = self
                    .client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?;
                Ok(bytes.to_vec())
            }
        }
    }

    fn spawn_voice(
        &self,
        load_id: LoadId,
        decoded: DecodedAudio,
        status_tx: StatusSender,
    ) -> Result<(
        std_mpsc::Sender<()>,
        JoinHandle<()>,
        oneshot::Receiver<Result<Arc<PlaybackControl>>>,
    )> {
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = oneshot::channel();
        let device_name = self.device_name.clone();
        let thread_status_tx = status_tx;

        let thread = std::thread::Builder::new()
            .name(format!("tilawa-audio-{}", load_id))
            .spawn(move || {
                let (stream, control) =
                    match open_stream(device_name.as_deref(), load_id, decoded, thread_status_tx.clone()) {
                        Ok(opened) => opened,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                let _ = ready_tx.send(Ok(Arc::clone(&control)));

                let mut reported = false;
                loop {
                    match stop_rx.recv_timeout(FINISH_POLL_INTERVAL) {
                        Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(std_mpsc::RecvTimeoutError::Timeout) => {
                            if !reported && control.finished.load(Ordering::Acquire) {
                                reported = true;
                                debug!("Load {} reached end of stream", load_id);
                                let _ = thread_status_tx.send(AudioStatus::finished(load_id));
                            }
                        }
                    }
                }

                drop(stream);
                let _ = thread_status_tx.send(AudioStatus::unloaded(load_id));
                debug!("Audio thread for load {} exited", load_id);
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn audio thread: {}", e)))?;

        Ok((stop_tx, thread, ready_rx))
    }
}

#[async_trait]
impl AudioOutput for DeviceOutput {
    async fn prepare(&self) -> Result<()> {
        let device = select_device(self.device_name.as_deref())?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Audio output ready on device: {}", name);
        Ok(())
    }

    async fn load(&self, load_id: LoadId, source: &AudioSource, status_tx: StatusSender) -> Result<()> {
        debug!("Loading {} (load {})", source, load_id);
        self.wanted.store(load_id, Ordering::Release);

        let bytes = self.fetch(source).await?;
        let hint = format_hint(source);
        let decoded = tokio::task::spawn_blocking(move || SimpleDecoder::decode_bytes(bytes, hint.as_deref()))
            .await
            .map_err(|e| Error::Internal(format!("Decode task failed: {}", e)))??;

        if !self.is_wanted(load_id) {
            debug!("Load {} abandoned after decode", load_id);
            return Ok(());
        }

        let (stop_tx, thread, ready_rx) = self.spawn_voice(load_id, decoded, status_tx.clone())?;

        let control = match ready_rx.await {
            Ok(Ok(control)) => control,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(Error::AudioOutput("Audio thread exited before starting".to_string()));
            }
        };

        let voice = ActiveVoice {
            load_id,
            control,
            status_tx: status_tx.clone(),
            stop_tx,
            thread,
        };

        // Checked under the lock `unload` takes, so an unload that raced
        // this load either sees the voice or makes it abandon here
        let mut active = self.active.lock().await;
        if !self.is_wanted(load_id) {
            drop(active);
            debug!("Load {} abandoned before playback", load_id);
            stop_voice(voice).await;
            return Ok(());
        }
        let previous = active.replace(voice);
        drop(active);
        if let Some(previous) = previous {
            warn!("Load {} replaced load {} without unload", load_id, previous.load_id);
            stop_voice(previous).await;
        }

        let _ = status_tx.send(AudioStatus::playing(load_id));
        info!("Playing {} (load {})", source, load_id);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let active = self.active.lock().await;
        if let Some(voice) = active.as_ref() {
            voice.control.paused.store(true, Ordering::Release);
            let _ = voice.status_tx.send(AudioStatus::paused(voice.load_id));
            debug!("Paused load {}", voice.load_id);
        }
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        let active = self.active.lock().await;
        if let Some(voice) = active.as_ref() {
            voice.control.paused.store(false, Ordering::Release);
            let _ = voice.status_tx.send(AudioStatus::playing(voice.load_id));
            debug!("Resumed load {}", voice.load_id);
        }
        Ok(())
    }

    async fn unload(&self) -> Result<()> {
        self.wanted.store(0, Ordering::Release);
        let voice = self.active.lock().await.take();
        if let Some(voice) = voice {
            debug!("Unloading load {}", voice.load_id);
            stop_voice(voice).await;
        }
        Ok(())
    }
}

async fn stop_voice(voice: ActiveVoice) {
    let _ = voice.stop_tx.send(());
    let thread = voice.thread;
    if let Err(e) = tokio::task::spawn_blocking(move || thread.join()).await {
        warn!("Failed to join audio thread: {}", e);
    }
}

/// File extension used as decoder format hint
fn format_hint(source: &AudioSource) -> Option<String> {
    match source {
        AudioSource::LocalFile(path) => path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string),
        AudioSource::RemoteUrl(url) => {
            let last = url.split(['?', '#']).next()?.rsplit('/').next()?;
            let (_, ext) = last.rsplit_once('.')?;
            (!ext.is_empty()).then(|| ext.to_string())
        }
    }
}

/// Find the requested device, falling back to the default device
fn select_device(device_name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    if let Some(name) = device_name {
        let mut devices = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;
        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            return Ok(device);
        }
        warn!("Requested device '{}' not found, falling back to default device", name);
    }

    host.default_output_device()
        .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))
}

/// Get the best supported configuration for playback
///
/// Prefers a stereo f32 config covering the verse's own sample rate so no
/// resampling is needed.
fn get_best_config(device: &Device, preferred_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
    let mut supported_configs = device
        .supported_output_configs()
        .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

    let preferred = supported_configs.find(|config| {
        config.channels() == 2
            && config.min_sample_rate().0 <= preferred_rate
            && config.max_sample_rate().0 >= preferred_rate
            && config.sample_format() == SampleFormat::F32
    });

    if let Some(supported_config) = preferred {
        let sample_format = supported_config.sample_format();
        let config = supported_config
            .with_sample_rate(cpal::SampleRate(preferred_rate))
            .config();
        return Ok((config, sample_format));
    }

    let supported_config = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

    let sample_format = supported_config.sample_format();
    Ok((supported_config.config(), sample_format))
}

/// Runs on the audio thread: convert samples and start the stream
fn open_stream(
    device_name: Option<&str>,
    load_id: LoadId,
    decoded: DecodedAudio,
    status_tx: StatusSender,
) -> Result<(Stream, Arc<PlaybackControl>)> {
    let device = select_device(device_name)?;
    let (config, sample_format) = get_best_config(&device, decoded.sample_rate)?;
    debug!(
        "Audio config: sample_rate={}, channels={}, format={:?}",
        config.sample_rate.0, config.channels, sample_format
    );

    let resampled = Resampler::resample(
        &decoded.samples,
        decoded.sample_rate,
        config.sample_rate.0,
        decoded.channels,
    )?;
    let samples = remix_channels(&resampled, decoded.channels, config.channels);
    let control = Arc::new(PlaybackControl::new(samples));

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, &control, load_id, status_tx)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, &control, load_id, status_tx)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, &control, load_id, status_tx)?,
        sample_format => {
            return Err(Error::AudioOutput(format!(
                "Unsupported sample format: {:?}",
                sample_format
            )));
        }
    };

    stream
        .play()
        .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

    Ok((stream, control))
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    control: &Arc<PlaybackControl>,
    load_id: LoadId,
    status_tx: StatusSender,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let control = Arc::clone(control);
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| control.fill(data),
            move |err| {
                error!("Audio stream error on load {}: {}", load_id, err);
                let _ = status_tx.send(AudioStatus::failed(load_id, err.to_string()));
            },
            None,
        )
        .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
}
