//! Simulated audio devices.
//!
//! Streams run on paced threads that invoke the callbacks at the configured
//! block rate, the way a hardware driver would. Inputs generate a [`Signal`];
//! the output records the last block it was handed. Failures can be injected
//! per device and stream action.

use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use mixer_ipc::DeviceSelector;

use crate::device::{AudioStream, DeviceLayer, InputCallback, OutputCallback, StreamFormat};
use crate::error::{AudioError, StreamAction};
use crate::AudioResult;

/// Label the default device is registered under.
pub const DEFAULT_DEVICE: &str = "default";

/// Waveform produced by a simulated input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    Silence,
    Constant(f32),
    Sine { frequency: f32, amplitude: f32 },
}

impl Signal {
    fn sample(&self, phase: f32) -> f32 {
        match *self {
            Signal::Silence => 0.0,
            Signal::Constant(value) => value,
            Signal::Sine { amplitude, .. } => amplitude * phase.sin(),
        }
    }

    fn phase_step(&self, sample_rate: u32) -> f32 {
        match *self {
            Signal::Sine { frequency, .. } if sample_rate > 0 => TAU * frequency / sample_rate as f32,
            _ => 0.0,
        }
    }
}

#[derive(Default)]
struct SimState {
    inputs: Mutex<HashMap<String, Signal>>,
    failures: Mutex<HashSet<(String, StreamAction)>>,
    last_output: Mutex<Vec<f32>>,
    live_streams: AtomicUsize,
    opened_streams: AtomicUsize,
    output_blocks: AtomicU64,
}

impl SimState {
    fn check(&self, label: &str, action: StreamAction) -> AudioResult<()> {
        if self.failures.lock().contains(&(label.to_string(), action)) {
            return Err(AudioError::Backend(format!(
                "simulated {} failure on {}",
                action, label
            )));
        }
        Ok(())
    }
}

/// A device layer backed by generated signals instead of hardware.
///
/// Clones share state, so a test can keep a handle for inspection after
/// handing one to a mixer.
#[derive(Clone, Default)]
pub struct SimulatedDevices {
    state: Arc<SimState>,
}

impl SimulatedDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capture device producing `signal`.
    pub fn with_input(self, name: &str, signal: Signal) -> Self {
        self.state.inputs.lock().insert(name.to_string(), signal);
        self
    }

    /// Make `action` fail on every stream of the named device.
    pub fn fail_on(self, name: &str, action: StreamAction) -> Self {
        self.state
            .failures
            .lock()
            .insert((name.to_string(), action));
        self
    }

    /// Streams opened and not yet closed.
    pub fn live_streams(&self) -> usize {
        self.state.live_streams.load(Ordering::SeqCst)
    }

    /// Streams opened over the layer's lifetime.
    pub fn opened_streams(&self) -> usize {
        self.state.opened_streams.load(Ordering::SeqCst)
    }

    /// Blocks delivered to output devices.
    pub fn output_blocks(&self) -> u64 {
        self.state.output_blocks.load(Ordering::SeqCst)
    }

    /// Copy of the last block an output device played.
    pub fn last_output(&self) -> Vec<f32> {
        self.state.last_output.lock().clone()
    }

    fn open(
        &self,
        device: &DeviceSelector,
        format: StreamFormat,
        endpoint: Endpoint,
    ) -> AudioResult<Box<dyn AudioStream>> {
        let label = match device {
            DeviceSelector::Default => DEFAULT_DEVICE,
            DeviceSelector::Named(name) => name.as_str(),
        };
        self.state.check(label, StreamAction::Open)?;

        self.state.opened_streams.fetch_add(1, Ordering::SeqCst);
        self.state.live_streams.fetch_add(1, Ordering::SeqCst);
        debug!(device = label, "Simulated stream opened");

        Ok(Box::new(SimStream {
            label: label.to_string(),
            format,
            state: Arc::clone(&self.state),
            endpoint: Some(endpoint),
            worker: None,
            should_stop: Arc::new(AtomicBool::new(false)),
        }))
    }
}

impl DeviceLayer for SimulatedDevices {
    fn open_input(
        &mut self,
        device: &DeviceSelector,
        format: StreamFormat,
        callback: InputCallback,
    ) -> AudioResult<Box<dyn AudioStream>> {
        let signal = match device {
            DeviceSelector::Default => self
                .state
                .inputs
                .lock()
                .get(DEFAULT_DEVICE)
                .copied()
                .unwrap_or(Signal::Silence),
            DeviceSelector::Named(name) => self
                .state
                .inputs
                .lock()
                .get(name)
                .copied()
                .ok_or_else(|| AudioError::DeviceNotFound(name.clone()))?,
        };

        self.open(device, format, Endpoint::Input { callback, signal })
    }

    fn open_output(
        &mut self,
        device: &DeviceSelector,
        format: StreamFormat,
        callback: OutputCallback,
    ) -> AudioResult<Box<dyn AudioStream>> {
        self.open(device, format, Endpoint::Output { callback })
    }
}

enum Endpoint {
    Input {
        callback: InputCallback,
        signal: Signal,
    },
    Output {
        callback: OutputCallback,
    },
}

struct SimStream {
    label: String,
    format: StreamFormat,
    state: Arc<SimState>,
    // Held here while stopped, moved into the worker while running.
    endpoint: Option<Endpoint>,
    worker: Option<JoinHandle<Endpoint>>,
    should_stop: Arc<AtomicBool>,
}

impl SimStream {
    fn halt(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };

        self.should_stop.store(true, Ordering::SeqCst);
        match handle.join() {
            Ok(endpoint) => self.endpoint = Some(endpoint),
            Err(_) => warn!(device = %self.label, "Simulated stream thread panicked"),
        }
    }
}

impl AudioStream for SimStream {
    fn start(&mut self) -> AudioResult<()> {
        self.state.check(&self.label, StreamAction::Start)?;

        if self.worker.is_some() {
            return Ok(());
        }
        let Some(endpoint) = self.endpoint.take() else {
            return Err(AudioError::Backend(format!(
                "stream on {} lost its callback",
                self.label
            )));
        };

        self.should_stop.store(false, Ordering::SeqCst);
        let should_stop = Arc::clone(&self.should_stop);
        let state = Arc::clone(&self.state);
        let format = self.format;

        self.worker = Some(thread::spawn(move || {
            run_endpoint(endpoint, format, &state, &should_stop)
        }));
        Ok(())
    }

    fn stop(&mut self) -> AudioResult<()> {
        // The device goes quiet even when the driver reports an error.
        self.halt();
        self.state.check(&self.label, StreamAction::Stop)
    }

    fn close(self: Box<Self>) -> AudioResult<()> {
        let result = self.state.check(&self.label, StreamAction::Close);
        drop(self);
        result
    }
}

impl Drop for SimStream {
    fn drop(&mut self) {
        self.halt();
        self.state.live_streams.fetch_sub(1, Ordering::SeqCst);
        debug!(device = %self.label, "Simulated stream closed");
    }
}

fn block_period(format: StreamFormat) -> Duration {
    if format.sample_rate == 0 {
        return Duration::from_millis(10);
    }
    Duration::from_secs_f64(format.frames_per_buffer as f64 / format.sample_rate as f64)
}

/// Drive one endpoint at the block rate until asked to stop.
fn run_endpoint(
    mut endpoint: Endpoint,
    format: StreamFormat,
    state: &SimState,
    should_stop: &AtomicBool,
) -> Endpoint {
    let period = block_period(format);
    let channels = usize::from(format.channels.max(1));
    let mut buffer = vec![0.0f32; format.samples_per_buffer()];
    let mut phase = 0.0f32;
    let mut next_tick = Instant::now();

    while !should_stop.load(Ordering::SeqCst) {
        match &mut endpoint {
            Endpoint::Input { callback, signal } => {
                let step = signal.phase_step(format.sample_rate);
                for frame in buffer.chunks_mut(channels) {
                    frame.fill(signal.sample(phase));
                    phase = (phase + step) % TAU;
                }
                callback(buffer.as_slice());
            }
            Endpoint::Output { callback } => {
                callback(buffer.as_mut_slice());
                state.last_output.lock().clone_from(&buffer);
                state.output_blocks.fetch_add(1, Ordering::SeqCst);
            }
        }

        next_tick += period;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            next_tick = now;
        }
    }

    endpoint
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    const FORMAT: StreamFormat = StreamFormat {
        sample_rate: 48000,
        frames_per_buffer: 48,
        channels: 2,
    };

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn test_input_delivers_signal() {
        let mut devices = SimulatedDevices::new().with_input("mic", Signal::Constant(0.25));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut stream = devices
            .open_input(
                &DeviceSelector::named("mic"),
                FORMAT,
                Box::new(move |samples: &[f32]| sink.lock().push(samples.to_vec())),
            )
            .unwrap();
        stream.start().unwrap();
        assert!(wait_for(|| !seen.lock().is_empty()));
        stream.stop().unwrap();
        stream.close().unwrap();

        let blocks = seen.lock();
        assert_eq!(blocks[0].len(), FORMAT.samples_per_buffer());
        assert!(blocks[0].iter().all(|&s| s == 0.25));
    }

    #[test]
    fn test_sine_is_interleaved_per_frame() {
        let mut devices = SimulatedDevices::new().with_input(
            DEFAULT_DEVICE,
            Signal::Sine {
                frequency: 1000.0,
                amplitude: 0.5,
            },
        );
        let first = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&first);

        let mut stream = devices
            .open_input(
                &DeviceSelector::Default,
                FORMAT,
                Box::new(move |samples: &[f32]| {
                    sink.lock().get_or_insert_with(|| samples.to_vec());
                }),
            )
            .unwrap();
        stream.start().unwrap();
        assert!(wait_for(|| first.lock().is_some()));
        stream.close().unwrap();

        let block = first.lock().take().unwrap();
        for frame in block.chunks(2) {
            assert_eq!(frame[0], frame[1]);
            assert!(frame[0].abs() <= 0.5);
        }
        assert!(block.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_output_records_last_block() {
        let mut devices = SimulatedDevices::new();
        let mut stream = devices
            .open_output(
                &DeviceSelector::Default,
                FORMAT,
                Box::new(|out: &mut [f32]| out.fill(0.75)),
            )
            .unwrap();
        stream.start().unwrap();
        assert!(wait_for(|| devices.output_blocks() > 0));
        stream.stop().unwrap();

        assert!(devices.last_output().iter().all(|&s| s == 0.75));
        stream.close().unwrap();
    }

    #[test]
    fn test_stop_halts_callbacks_and_restart_resumes() {
        let mut devices = SimulatedDevices::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let mut stream = devices
            .open_output(
                &DeviceSelector::Default,
                FORMAT,
                Box::new(move |_: &mut [f32]| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        stream.start().unwrap();
        assert!(wait_for(|| calls.load(Ordering::SeqCst) > 0));
        stream.stop().unwrap();

        let after_stop = calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);

        stream.start().unwrap();
        assert!(wait_for(|| calls.load(Ordering::SeqCst) > after_stop));
        stream.close().unwrap();
    }

    #[test]
    fn test_unknown_input_is_not_found() {
        let mut devices = SimulatedDevices::new();
        let result = devices.open_input(&DeviceSelector::named("ghost"), FORMAT, Box::new(|_: &[f32]| {}));
        assert!(matches!(result, Err(AudioError::DeviceNotFound(name)) if name == "ghost"));
        assert_eq!(devices.live_streams(), 0);
    }

    #[test]
    fn test_injected_failures() {
        let mut devices = SimulatedDevices::new()
            .fail_on("speakers", StreamAction::Open)
            .fail_on(DEFAULT_DEVICE, StreamAction::Close);

        let result = devices.open_output(
            &DeviceSelector::named("speakers"),
            FORMAT,
            Box::new(|_: &mut [f32]| {}),
        );
        assert!(result.is_err());

        let stream = devices
            .open_output(&DeviceSelector::Default, FORMAT, Box::new(|_: &mut [f32]| {}))
            .unwrap();
        assert_eq!(devices.live_streams(), 1);

        let err = stream.close().unwrap_err();
        assert_eq!(err.to_string(), "Audio backend error: simulated close failure on default");
        assert_eq!(devices.live_streams(), 0);
        assert_eq!(devices.opened_streams(), 1);
    }
}
