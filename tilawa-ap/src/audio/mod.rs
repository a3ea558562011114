//! Audio subsystem
//!
//! `AudioOutput` is the seam between the engine and the device: it takes a
//! source, decodes and plays it, and reports status on a channel.
//! `DeviceOutput` implements it with symphonia, rubato and cpal.

pub mod decoder;
pub mod device;
pub mod output;
pub mod resampler;
pub mod types;

pub use device::DeviceOutput;
pub use output::AudioOutput;
pub use types::{status_channel, AudioSource, AudioStatus, LoadId, StatusReceiver, StatusSender};
