//! Events sent from the engine to the control surface.

use serde::{Deserialize, Serialize};

use crate::state::MixerState;
use crate::types::{LevelSnapshot, WarningType};

/// Events that the engine can send to a control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MixerEvent {
    /// Mixer state has changed.
    StateChanged {
        /// Previous state.
        previous: Box<MixerState>,

        /// Current state.
        current: Box<MixerState>,
    },

    /// Periodic level and latency telemetry.
    Levels(LevelSnapshot),

    /// Performance warning detected.
    PerformanceWarning(WarningType),

    /// Error occurred.
    Error {
        /// Whether the error is recoverable.
        recoverable: bool,

        /// Error message.
        message: String,
    },

    /// Engine is ready.
    Ready,

    /// Engine has shut down.
    Shutdown,
}
