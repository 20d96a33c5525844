//! Mixer state machine types.

use serde::{Deserialize, Serialize};

/// The current state of the mixer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum MixerState {
    /// No streams are open.
    #[default]
    Stopped,

    /// Streams are open and callbacks are mixing.
    Running,

    /// The last start attempt failed; no streams are open.
    Error {
        /// Error message.
        message: String,

        /// Whether a retry may succeed.
        recoverable: bool,
    },
}

impl MixerState {
    /// Returns true if the mixer is stopped.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns true if the mixer is running.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if the mixer is in an error state.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Running => "Running",
            Self::Error { .. } => "Error",
        }
    }
}
