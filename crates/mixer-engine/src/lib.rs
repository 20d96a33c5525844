//! Command-driven orchestrator for the audio mixer.
//!
//! This crate runs an [`AudioMixer`](mixer_audio::AudioMixer) behind the
//! command and event channels defined in `mixer-ipc`, publishing levels and
//! performance warnings while the mixer runs.

mod metrics;
mod orchestrator;

pub use metrics::{warnings_for, MetricsCollector, NEAR_CLIPPING_LEVEL, OVERLOAD_LOAD_PERCENT};
pub use orchestrator::{Engine, METRICS_INTERVAL};

use crossbeam_channel::{Receiver, Sender};
use mixer_audio::DeviceLayer;
use mixer_ipc::{MixerCommand, MixerConfig, MixerEvent};

/// Create an engine instance with IPC channels.
pub fn create_engine<L: DeviceLayer>(
    layer: L,
    config: &MixerConfig,
    command_rx: Receiver<MixerCommand>,
    event_tx: Sender<MixerEvent>,
) -> Engine<L> {
    Engine::new(layer, config, command_rx, event_tx)
}
