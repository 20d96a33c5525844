//! Real-time two-input audio mixing.
//!
//! This crate mixes two capture streams into one playback stream. Input
//! callbacks push samples into lock-free ring buffers; the output callback
//! drains them, applies per-input and master gain, and soft clips the sum.
//! Device access goes through the [`DeviceLayer`] trait, implemented by a
//! cpal backend (feature `cpal-backend`) and by [`SimulatedDevices`].

mod config;
#[cfg(feature = "cpal-backend")]
mod cpal_device;
mod device;
mod engine;
mod error;
mod meter;
mod mixer;
mod params;
mod pool;
mod ring;
mod sim;

pub use config::sanitize_config;
#[cfg(feature = "cpal-backend")]
pub use cpal_device::{enumerate_audio_devices, CpalDeviceLayer};
pub use device::{AudioStream, DeviceLayer, InputCallback, OutputCallback, StreamFormat};
pub use engine::{soft_clip, MixingEngine};
pub use error::{AudioError, StreamAction, StreamRole};
pub use meter::{level_to_db, rms, SILENCE_DB};
pub use mixer::AudioMixer;
pub use params::{clamp_gain, AtomicF32, InputChannel, MixerParams};
pub use pool::{SampleBlock, SamplePool};
pub use ring::{ring_buffer, RingConsumer, RingProducer};
pub use sim::{Signal, SimulatedDevices, DEFAULT_DEVICE};

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default frames per callback.
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Default interleaved channel count.
pub const DEFAULT_CHANNELS: u16 = 2;

/// Highest supported channel count.
pub const MAX_CHANNELS: u16 = 2;

/// Ring buffers hold this many callback blocks.
pub const RING_BUFFER_MARGIN: usize = 10;

/// Lowest accepted gain.
pub const MIN_GAIN: f32 = 0.0;

/// Highest accepted gain.
pub const MAX_GAIN: f32 = 2.0;

/// Scratch blocks preallocated per mixing engine (one per input).
pub const SCRATCH_BLOCKS: usize = 2;
