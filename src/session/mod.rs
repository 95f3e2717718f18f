//! Capture session configuration.

pub mod capture_backend;
pub mod configurator;
pub mod transaction;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::devices::{DeviceDescriptor, MediaKind};

pub use capture_backend::{BackendError, CaptureBackend};
pub use configurator::SessionConfigurator;
pub use transaction::ConfigurationTransaction;

/// Outcome of the most recent configuration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupResult {
    Success,
    NotAuthorized,
    ConfigurationFailed,
}

impl SetupResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotAuthorized => "not_authorized",
            Self::ConfigurationFailed => "configuration_failed",
        }
    }
}

/// Which inputs a configuration attempt should bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingRequest {
    pub want_video: bool,
    pub want_audio: bool,
}

impl BindingRequest {
    pub fn video_only() -> Self {
        Self {
            want_video: true,
            want_audio: false,
        }
    }

    pub fn video_and_audio() -> Self {
        Self {
            want_video: true,
            want_audio: true,
        }
    }
}

impl Default for BindingRequest {
    fn default() -> Self {
        Self::video_only()
    }
}

/// The committed hardware graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBinding {
    pub video_input: Option<DeviceDescriptor>,
    pub audio_input: Option<DeviceDescriptor>,
    pub audio_output_attached: bool,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("capture is not authorized")]
    NotAuthorized,
    #[error("no video device matched the selection policy")]
    NoVideoDevice,
    #[error("no audio device matched the selection policy")]
    NoAudioDevice,
    #[error("session rejected {kind} input {device_id}")]
    InputRejected { kind: MediaKind, device_id: String },
    #[error("could not create {kind} input for {device_id}: {reason}")]
    DeviceCreationFailed {
        kind: MediaKind,
        device_id: String,
        reason: String,
    },
    #[error("session rejected the audio output")]
    OutputRejected,
}

impl ConfigurationError {
    /// Setup result the coordinator records for this error.
    pub fn setup_result(&self) -> SetupResult {
        match self {
            Self::NotAuthorized => SetupResult::NotAuthorized,
            _ => SetupResult::ConfigurationFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_result_as_str() {
        assert_eq!(SetupResult::Success.as_str(), "success");
        assert_eq!(SetupResult::NotAuthorized.as_str(), "not_authorized");
        assert_eq!(
            SetupResult::ConfigurationFailed.as_str(),
            "configuration_failed"
        );
    }

    #[test]
    fn test_errors_collapse_to_configuration_failed() {
        assert_eq!(
            ConfigurationError::NotAuthorized.setup_result(),
            SetupResult::NotAuthorized
        );
        for err in [
            ConfigurationError::NoVideoDevice,
            ConfigurationError::NoAudioDevice,
            ConfigurationError::OutputRejected,
            ConfigurationError::InputRejected {
                kind: MediaKind::Video,
                device_id: "cam".to_string(),
            },
        ] {
            assert_eq!(err.setup_result(), SetupResult::ConfigurationFailed);
        }
    }

    #[test]
    fn test_error_messages_keep_cause() {
        let err = ConfigurationError::DeviceCreationFailed {
            kind: MediaKind::Audio,
            device_id: "mic".to_string(),
            reason: "busy".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "could not create audio input for mic: busy"
        );
    }
}
