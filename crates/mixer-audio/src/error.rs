//! Error types for the audio module.

use std::fmt;

use thiserror::Error;

/// Which of the session's streams an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    /// First input stream.
    Input1,

    /// Second input stream.
    Input2,

    /// Output stream.
    Output,
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input1 => "input1",
            Self::Input2 => "input2",
            Self::Output => "output",
        })
    }
}

/// Lifecycle step that failed on a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamAction {
    Open,
    Start,
    Stop,
    Close,
}

impl fmt::Display for StreamAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Close => "close",
        })
    }
}

/// Errors that can occur during audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Audio device not found.
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Audio format not supported.
    #[error("Audio format not supported: {0}")]
    FormatNotSupported(String),

    /// Error reported by the device backend.
    #[error("Audio backend error: {0}")]
    Backend(String),

    /// A lifecycle step failed on one of the session's streams.
    #[error("Failed to {action} {role} stream: {source}")]
    Stream {
        role: StreamRole,
        action: StreamAction,
        #[source]
        source: Box<AudioError>,
    },

    /// One or more streams failed to stop or close cleanly.
    #[error("Errors during stop: {}", join_errors(.0))]
    Shutdown(Vec<AudioError>),
}

impl AudioError {
    /// Attach the failing stream and step to a backend error.
    pub fn stream(role: StreamRole, action: StreamAction, source: AudioError) -> Self {
        Self::Stream {
            role,
            action,
            source: Box::new(source),
        }
    }
}

fn join_errors(errors: &[AudioError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(feature = "cpal-backend")]
impl From<cpal::BuildStreamError> for AudioError {
    fn from(err: cpal::BuildStreamError) -> Self {
        Self::Backend(err.to_string())
    }
}

#[cfg(feature = "cpal-backend")]
impl From<cpal::PlayStreamError> for AudioError {
    fn from(err: cpal::PlayStreamError) -> Self {
        Self::Backend(err.to_string())
    }
}

#[cfg(feature = "cpal-backend")]
impl From<cpal::PauseStreamError> for AudioError {
    fn from(err: cpal::PauseStreamError) -> Self {
        Self::Backend(err.to_string())
    }
}

#[cfg(feature = "cpal-backend")]
impl From<cpal::DevicesError> for AudioError {
    fn from(err: cpal::DevicesError) -> Self {
        Self::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_error_message() {
        let err = AudioError::stream(
            StreamRole::Input2,
            StreamAction::Open,
            AudioError::DeviceNotFound("BlackHole".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Failed to open input2 stream: Audio device not found: BlackHole"
        );
    }

    #[test]
    fn test_shutdown_error_lists_every_failure() {
        let err = AudioError::Shutdown(vec![
            AudioError::stream(
                StreamRole::Input1,
                StreamAction::Stop,
                AudioError::Backend("busy".to_string()),
            ),
            AudioError::stream(
                StreamRole::Output,
                StreamAction::Close,
                AudioError::Backend("gone".to_string()),
            ),
        ]);
        let message = err.to_string();
        assert!(message.contains("Failed to stop input1 stream"));
        assert!(message.contains("Failed to close output stream"));
    }
}
