//! Commands sent from the control surface to the engine.

use serde::{Deserialize, Serialize};

/// Commands that a control surface can send to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MixerCommand {
    /// Open the configured streams and start mixing.
    Start,

    /// Stop mixing and close all streams.
    Stop,

    /// Set input 1 gain (clamped to 0.0 - 2.0).
    SetInput1Gain(f32),

    /// Set input 2 gain (clamped to 0.0 - 2.0).
    SetInput2Gain(f32),

    /// Set master gain (clamped to 0.0 - 2.0).
    SetMasterGain(f32),

    /// Mute or unmute input 1.
    SetInput1Muted(bool),

    /// Mute or unmute input 2.
    SetInput2Muted(bool),

    /// Request current mixer state.
    GetState,

    /// Stop and shut the engine down.
    Shutdown,
}
