//! Common types used across IPC messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which device a stream should be opened on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceSelector {
    /// The host's default device for the stream direction.
    Default,

    /// A device matched by its reported name.
    Named(String),
}

impl DeviceSelector {
    /// Create a selector for a named device.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Returns a display label for logs and the UI.
    pub fn label(&self) -> &str {
        match self {
            Self::Default => "default",
            Self::Named(name) => name,
        }
    }
}

/// Configuration for a mixing session.
///
/// Each device slot is optional: `None` disables that path, and a disabled
/// input contributes silence to the mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Sample rate in Hz shared by all streams (default: 48000).
    pub sample_rate: u32,

    /// Frames per device callback (default: 512).
    pub buffer_size: u32,

    /// Interleaved channel count, 1 or 2 (default: 2).
    pub channels: u16,

    /// First input, typically a microphone.
    pub input1_device: Option<DeviceSelector>,

    /// Second input, typically application or loopback audio.
    pub input2_device: Option<DeviceSelector>,

    /// Output device receiving the mix.
    pub output_device: Option<DeviceSelector>,

    /// Initial gain for input 1 (0.0 - 2.0).
    pub input1_gain: f32,

    /// Initial gain for input 2 (0.0 - 2.0).
    pub input2_gain: f32,

    /// Initial master gain (0.0 - 2.0).
    pub master_gain: f32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 512,
            channels: 2,
            input1_device: Some(DeviceSelector::Default),
            input2_device: None,
            output_device: Some(DeviceSelector::Default),
            input1_gain: 1.0,
            input2_gain: 1.0,
            master_gain: 1.0,
        }
    }
}

impl MixerConfig {
    /// Samples in one callback block (frames × channels).
    pub fn samples_per_callback(&self) -> usize {
        self.buffer_size as usize * self.channels as usize
    }

    /// Time between two device callbacks.
    pub fn callback_period(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.buffer_size as f64 / self.sample_rate as f64)
    }
}

/// Snapshot of mixer levels and timing, published while running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    /// RMS level of input 1 before gain.
    pub input1_level: f32,

    /// RMS level of input 2 before gain.
    pub input2_level: f32,

    /// RMS level of the mixed output.
    pub output_level: f32,

    /// Current input 1 gain.
    pub input1_gain: f32,

    /// Current input 2 gain.
    pub input2_gain: f32,

    /// Current master gain.
    pub master_gain: f32,

    /// Time spent in the last mixing pass, in microseconds.
    pub processing_latency_us: u64,

    /// Processing time as a percentage of the callback period.
    pub processing_load_percent: f32,
}

/// Types of performance warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WarningType {
    /// Mixing is using too much of the callback period.
    ProcessingOverload { load_percent: f32 },

    /// Output level is close to full scale.
    OutputNearClipping { level: f32 },
}

/// An audio device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Unique identifier for this device.
    pub id: String,

    /// Display name for the UI.
    pub name: String,

    /// Type of audio device.
    pub device_type: AudioDeviceType,

    /// Whether this is the default device.
    pub is_default: bool,
}

/// Type of audio device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AudioDeviceType {
    /// Capture device.
    Input,

    /// Playback device.
    Output,
}
