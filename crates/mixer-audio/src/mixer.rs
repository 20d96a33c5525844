//! Audio mixing session lifecycle.
//!
//! [`AudioMixer`] owns the running flag, the parameter store, and the open
//! device streams. Starting wires each input stream to a ring buffer and the
//! output stream to a [`MixingEngine`]; stopping tears them down and waits
//! until no callback is executing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_utils::Backoff;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use mixer_ipc::{DeviceSelector, MixerConfig};

use crate::config::sanitize_config;
use crate::device::{AudioStream, DeviceLayer, InputCallback, OutputCallback, StreamFormat};
use crate::engine::MixingEngine;
use crate::error::{AudioError, StreamAction, StreamRole};
use crate::meter::rms;
use crate::params::{InputChannel, MixerParams};
use crate::pool::SamplePool;
use crate::ring::{ring_buffer, RingConsumer, RingProducer};
use crate::{AudioResult, RING_BUFFER_MARGIN, SCRATCH_BLOCKS};

/// Admission control for device callbacks.
///
/// A callback registers itself before checking the running flag, and the
/// control thread clears the flag before waiting for the count to drain. With
/// both sides sequentially consistent, once `wait_idle` returns no callback
/// can be inside the gate and none can enter it.
#[derive(Debug, Default)]
struct CallbackGate {
    running: AtomicBool,
    in_flight: AtomicUsize,
}

impl CallbackGate {
    fn enter(&self) -> Option<CallbackGuard<'_>> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.running.load(Ordering::SeqCst) {
            Some(CallbackGuard { gate: self })
        } else {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            None
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn open(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    fn close(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn wait_idle(&self) {
        let backoff = Backoff::new();
        while self.in_flight.load(Ordering::SeqCst) != 0 {
            if backoff.is_completed() {
                thread::sleep(Duration::from_micros(100));
            } else {
                backoff.snooze();
            }
        }
    }
}

struct CallbackGuard<'a> {
    gate: &'a CallbackGate,
}

impl Drop for CallbackGuard<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

struct OpenStream {
    role: StreamRole,
    stream: Box<dyn AudioStream>,
}

struct MixerInner<L> {
    layer: L,
    streams: Vec<OpenStream>,
}

/// A mixing session over up to two inputs and one output.
pub struct AudioMixer<L: DeviceLayer> {
    config: MixerConfig,
    params: Arc<MixerParams>,
    gate: Arc<CallbackGate>,
    inner: Mutex<MixerInner<L>>,
}

impl<L: DeviceLayer> AudioMixer<L> {
    /// Create a stopped mixer. Invalid configuration values are replaced by defaults.
    pub fn new(layer: L, config: &MixerConfig) -> Self {
        let config = sanitize_config(config);
        let params = Arc::new(MixerParams::new(
            config.input1_gain,
            config.input2_gain,
            config.master_gain,
        ));

        Self {
            config,
            params,
            gate: Arc::new(CallbackGate::default()),
            inner: Mutex::new(MixerInner {
                layer,
                streams: Vec::new(),
            }),
        }
    }

    /// Open the configured streams and start mixing.
    ///
    /// Starting a running mixer does nothing. If any stream fails to open or
    /// start, the streams opened so far are closed and the mixer stays stopped.
    #[instrument(name = "mixer_start", skip(self))]
    pub fn start(&self) -> AudioResult<()> {
        let mut inner = self.inner.lock();

        if self.gate.is_running() {
            debug!("Mixer already running, ignoring start");
            return Ok(());
        }

        let format = StreamFormat::from(&self.config);
        info!(
            sample_rate = format.sample_rate,
            frames = format.frames_per_buffer,
            channels = format.channels,
            "Starting audio mixer"
        );

        self.params.reset_telemetry();

        let mut opened = Vec::new();
        if let Err(e) = self.open_streams(&mut inner.layer, format, &mut opened) {
            warn!("Mixer start failed: {}", e);
            for err in shutdown_streams(opened) {
                warn!("Rollback error: {}", err);
            }
            return Err(e);
        }

        inner.streams = opened;
        self.gate.open();

        info!(streams = inner.streams.len(), "Audio mixer started");
        Ok(())
    }

    /// Stop mixing and close every stream.
    ///
    /// Stopping a stopped mixer does nothing. All streams are closed even if
    /// some fail; the failures are returned together. When this returns, no
    /// callback is running and none will touch the session again.
    #[instrument(name = "mixer_stop", skip(self))]
    pub fn stop(&self) -> AudioResult<()> {
        let mut inner = self.inner.lock();

        if !self.gate.is_running() {
            return Ok(());
        }

        info!("Stopping audio mixer");
        self.gate.close();

        let errors = shutdown_streams(std::mem::take(&mut inner.streams));
        self.gate.wait_idle();

        if errors.is_empty() {
            info!("Audio mixer stopped");
            Ok(())
        } else {
            warn!(count = errors.len(), "Audio mixer stopped with errors");
            Err(AudioError::Shutdown(errors))
        }
    }

    fn open_streams(
        &self,
        layer: &mut L,
        format: StreamFormat,
        opened: &mut Vec<OpenStream>,
    ) -> AudioResult<()> {
        let ring_capacity = format.samples_per_buffer() * RING_BUFFER_MARGIN;

        let input1 = self.open_input(
            layer,
            StreamRole::Input1,
            InputChannel::Input1,
            self.config.input1_device.as_ref(),
            format,
            ring_capacity,
            opened,
        )?;
        let input2 = self.open_input(
            layer,
            StreamRole::Input2,
            InputChannel::Input2,
            self.config.input2_device.as_ref(),
            format,
            ring_capacity,
            opened,
        )?;

        let Some(device) = self.config.output_device.as_ref() else {
            debug!("No output device configured");
            return Ok(());
        };

        let pool = SamplePool::new(format.samples_per_buffer(), SCRATCH_BLOCKS);
        let engine = MixingEngine::new(input1, input2, pool, Arc::clone(&self.params));
        let callback = output_callback(Arc::clone(&self.gate), engine);

        debug!(device = device.label(), "Opening output stream");
        let stream = layer
            .open_output(device, format, callback)
            .map_err(|e| AudioError::stream(StreamRole::Output, StreamAction::Open, e))?;
        start_stream(StreamRole::Output, stream, opened)
    }

    #[allow(clippy::too_many_arguments)]
    fn open_input(
        &self,
        layer: &mut L,
        role: StreamRole,
        channel: InputChannel,
        device: Option<&DeviceSelector>,
        format: StreamFormat,
        ring_capacity: usize,
        opened: &mut Vec<OpenStream>,
    ) -> AudioResult<Option<RingConsumer>> {
        let Some(device) = device else {
            debug!(%role, "Input disabled");
            return Ok(None);
        };

        let (producer, consumer) = ring_buffer(ring_capacity);
        let callback = input_callback(
            Arc::clone(&self.gate),
            Arc::clone(&self.params),
            channel,
            producer,
        );

        debug!(%role, device = device.label(), "Opening input stream");
        let stream = layer
            .open_input(device, format, callback)
            .map_err(|e| AudioError::stream(role, StreamAction::Open, e))?;
        start_stream(role, stream, opened)?;

        Ok(Some(consumer))
    }

    /// Shared gain and telemetry store, usable from any thread.
    pub fn params(&self) -> &Arc<MixerParams> {
        &self.params
    }

    /// The effective (sanitized) configuration.
    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    /// Whether the mixer is running.
    pub fn is_running(&self) -> bool {
        self.gate.is_running()
    }

    /// Set input 1 gain (clamped to 0.0 - 2.0).
    pub fn set_input1_gain(&self, gain: f32) {
        self.params.set_input1_gain(gain);
    }

    /// Set input 2 gain (clamped to 0.0 - 2.0).
    pub fn set_input2_gain(&self, gain: f32) {
        self.params.set_input2_gain(gain);
    }

    /// Set master gain (clamped to 0.0 - 2.0).
    pub fn set_master_gain(&self, gain: f32) {
        self.params.set_master_gain(gain);
    }

    /// Set input 1 muted state.
    pub fn set_input1_muted(&self, muted: bool) {
        self.params.set_input_muted(InputChannel::Input1, muted);
    }

    /// Set input 2 muted state.
    pub fn set_input2_muted(&self, muted: bool) {
        self.params.set_input_muted(InputChannel::Input2, muted);
    }

    /// Current RMS level of input 1.
    pub fn input1_level(&self) -> f32 {
        self.params.input1_level()
    }

    /// Current RMS level of input 2.
    pub fn input2_level(&self) -> f32 {
        self.params.input2_level()
    }

    /// Current RMS level of the output.
    pub fn output_level(&self) -> f32 {
        self.params.output_level()
    }

    /// Time spent in the last mixing pass.
    pub fn processing_latency(&self) -> Duration {
        self.params.processing_latency()
    }
}

impl<L: DeviceLayer> Drop for AudioMixer<L> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn input_callback(
    gate: Arc<CallbackGate>,
    params: Arc<MixerParams>,
    channel: InputChannel,
    mut producer: RingProducer,
) -> InputCallback {
    Box::new(move |samples: &[f32]| {
        let Some(_guard) = gate.enter() else {
            return;
        };

        // Metered before gain so the level shows the raw source.
        params.publish_input_level(channel, rms(samples));
        producer.write(samples);
    })
}

fn output_callback(gate: Arc<CallbackGate>, mut engine: MixingEngine) -> OutputCallback {
    Box::new(move |out: &mut [f32]| {
        let Some(_guard) = gate.enter() else {
            out.fill(0.0);
            return;
        };

        engine.process(out);
    })
}

fn start_stream(
    role: StreamRole,
    mut stream: Box<dyn AudioStream>,
    opened: &mut Vec<OpenStream>,
) -> AudioResult<()> {
    if let Err(e) = stream.start() {
        if let Err(close_err) = stream.close() {
            warn!(%role, "Failed to close stream after start failure: {}", close_err);
        }
        return Err(AudioError::stream(role, StreamAction::Start, e));
    }

    debug!(%role, "Stream started");
    opened.push(OpenStream { role, stream });
    Ok(())
}

/// Stop and close every stream, collecting failures instead of bailing out.
fn shutdown_streams(streams: Vec<OpenStream>) -> Vec<AudioError> {
    let mut errors = Vec::new();

    for OpenStream { role, mut stream } in streams {
        if let Err(e) = stream.stop() {
            errors.push(AudioError::stream(role, StreamAction::Stop, e));
        }
        if let Err(e) = stream.close() {
            errors.push(AudioError::stream(role, StreamAction::Close, e));
        }
        debug!(%role, "Stream closed");
    }

    errors
}
