//! Capability interface implemented by device backends.
//!
//! The mixer never schedules audio itself: a backend opens streams and calls
//! the registered callbacks from its own real-time threads. Callbacks must be
//! treated as real-time code by the backend too; it may not hold locks the
//! control thread contends on while invoking them.

use mixer_ipc::{DeviceSelector, MixerConfig};

use crate::AudioResult;

/// Shape of every stream in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,

    /// Frames per callback.
    pub frames_per_buffer: u32,

    /// Interleaved channels per frame.
    pub channels: u16,
}

impl StreamFormat {
    /// Samples in one callback block.
    pub fn samples_per_buffer(&self) -> usize {
        self.frames_per_buffer as usize * self.channels as usize
    }
}

impl From<&MixerConfig> for StreamFormat {
    fn from(config: &MixerConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            frames_per_buffer: config.buffer_size,
            channels: config.channels,
        }
    }
}

/// Receives each captured block of interleaved samples.
pub type InputCallback = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// Fills each playback block of interleaved samples.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// An opened device stream.
pub trait AudioStream {
    /// Begin invoking the stream's callback.
    fn start(&mut self) -> AudioResult<()>;

    /// Stop invoking the callback. The stream may be restarted.
    fn stop(&mut self) -> AudioResult<()>;

    /// Release the stream. Its callback is dropped and never invoked again.
    fn close(self: Box<Self>) -> AudioResult<()>;
}

/// Opens streams on a device backend.
pub trait DeviceLayer {
    /// Open a capture stream that delivers blocks to `callback`.
    fn open_input(
        &mut self,
        device: &DeviceSelector,
        format: StreamFormat,
        callback: InputCallback,
    ) -> AudioResult<Box<dyn AudioStream>>;

    /// Open a playback stream that asks `callback` for blocks.
    fn open_output(
        &mut self,
        device: &DeviceSelector,
        format: StreamFormat,
        callback: OutputCallback,
    ) -> AudioResult<Box<dyn AudioStream>>;
}
