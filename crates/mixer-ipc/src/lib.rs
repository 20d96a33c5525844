//! Typed control <-> engine messages for the audio mixer.
//!
//! This crate defines the configuration and message types shared by the
//! mixing core, the engine, and any control surface.

mod commands;
mod events;
mod state;
mod types;

pub use commands::MixerCommand;
pub use events::MixerEvent;
pub use state::MixerState;
pub use types::{
    AudioDevice, AudioDeviceType, DeviceSelector, LevelSnapshot, MixerConfig, WarningType,
};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (control → engine).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for events (engine → control).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<MixerCommand>, Receiver<MixerCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<MixerEvent>, Receiver<MixerEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
