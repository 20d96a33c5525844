//! Main engine orchestrator.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, instrument, warn};

use mixer_audio::{AudioMixer, DeviceLayer};
use mixer_ipc::{MixerCommand, MixerConfig, MixerEvent, MixerState};

use crate::metrics::MetricsCollector;

/// How long the command loop waits before publishing telemetry.
pub const METRICS_INTERVAL: Duration = Duration::from_millis(100);

/// Drives an [`AudioMixer`] from a command channel.
///
/// The engine lives on one thread: device streams are not `Send`, so the
/// mixer is created and dropped where the engine runs.
pub struct Engine<L: DeviceLayer> {
    command_rx: Receiver<MixerCommand>,
    event_tx: Sender<MixerEvent>,
    state: MixerState,
    mixer: AudioMixer<L>,
    metrics: MetricsCollector,
}

impl<L: DeviceLayer> Engine<L> {
    /// Create a new engine.
    pub fn new(
        layer: L,
        config: &MixerConfig,
        command_rx: Receiver<MixerCommand>,
        event_tx: Sender<MixerEvent>,
    ) -> Self {
        let mixer = AudioMixer::new(layer, config);
        let metrics = MetricsCollector::new(
            Arc::clone(mixer.params()),
            mixer.config().callback_period(),
        );

        Self {
            command_rx,
            event_tx,
            state: MixerState::Stopped,
            mixer,
            metrics,
        }
    }

    /// Current state.
    pub fn state(&self) -> &MixerState {
        &self.state
    }

    /// Run the engine (blocking) until `Shutdown` or the command channel closes.
    #[instrument(name = "engine_run", skip(self))]
    pub fn run(&mut self) {
        info!("Engine starting");
        self.send_event(MixerEvent::Ready);

        loop {
            match self.command_rx.recv_timeout(METRICS_INTERVAL) {
                Ok(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    if self.state.is_running() {
                        self.emit_metrics();
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                    info!("Command channel disconnected, shutting down");
                    self.stop_mixer();
                    break;
                }
            }
        }

        info!("Engine stopped");
    }

    /// Handle a command. Returns false if engine should stop.
    fn handle_command(&mut self, command: MixerCommand) -> bool {
        debug!(?command, "Handling command");

        match command {
            MixerCommand::Start => self.start_mixer(),
            MixerCommand::Stop => self.stop_mixer(),
            MixerCommand::SetInput1Gain(gain) => self.mixer.set_input1_gain(gain),
            MixerCommand::SetInput2Gain(gain) => self.mixer.set_input2_gain(gain),
            MixerCommand::SetMasterGain(gain) => self.mixer.set_master_gain(gain),
            MixerCommand::SetInput1Muted(muted) => self.mixer.set_input1_muted(muted),
            MixerCommand::SetInput2Muted(muted) => self.mixer.set_input2_muted(muted),
            MixerCommand::GetState => self.send_state(),
            MixerCommand::Shutdown => {
                self.stop_mixer();
                self.send_event(MixerEvent::Shutdown);
                return false;
            }
        }

        true
    }

    fn start_mixer(&mut self) {
        if self.state.is_running() {
            debug!("Already running, ignoring start command");
            return;
        }

        match self.mixer.start() {
            Ok(()) => self.transition_to(MixerState::Running),
            Err(e) => {
                error!("Mixer start failed: {}", e);
                self.transition_to(MixerState::Error {
                    message: e.to_string(),
                    recoverable: true,
                });
            }
        }
    }

    fn stop_mixer(&mut self) {
        if !self.state.is_running() {
            debug!("Not running, ignoring stop command");
            return;
        }

        if let Err(e) = self.mixer.stop() {
            warn!("Mixer stopped with errors: {}", e);
            self.send_event(MixerEvent::Error {
                recoverable: true,
                message: e.to_string(),
            });
        }

        // The mixer is stopped even when stream teardown reported errors.
        self.transition_to(MixerState::Stopped);
    }

    fn send_state(&self) {
        self.send_event(MixerEvent::StateChanged {
            previous: Box::new(self.state.clone()),
            current: Box::new(self.state.clone()),
        });
    }

    fn emit_metrics(&self) {
        self.send_event(MixerEvent::Levels(self.metrics.snapshot()));

        for warning in self.metrics.check_warnings() {
            self.send_event(MixerEvent::PerformanceWarning(warning));
        }
    }

    fn transition_to(&mut self, new_state: MixerState) {
        let previous = std::mem::replace(&mut self.state, new_state.clone());

        debug!(
            previous = %previous.name(),
            current = %new_state.name(),
            "State transition"
        );

        self.send_event(MixerEvent::StateChanged {
            previous: Box::new(previous),
            current: Box::new(new_state),
        });
    }

    fn send_event(&self, event: MixerEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}
