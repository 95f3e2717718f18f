//! Capture session abstraction.

use async_trait::async_trait;
use thiserror::Error;

use crate::devices::DeviceDescriptor;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("device {0} is unavailable")]
    DeviceUnavailable(String),
    #[error("failed to open device {device}: {reason}")]
    OpenFailed { device: String, reason: String },
}

/// The platform capture session.
///
/// Graph mutation calls are quick but not safe for concurrent use; the caller
/// serializes them. `start` and `stop` are long-running and may block the
/// executing thread, so implementations backed by blocking platform calls
/// should move them onto a blocking pool.
#[async_trait]
pub trait CaptureBackend: Send {
    fn begin_configuration(&mut self);

    fn commit_configuration(&mut self);

    /// Remove every input and output from the graph.
    fn reset_graph(&mut self);

    /// Create an input for `device` and try to attach it.
    ///
    /// `Err` means the device input could not be created at all, `Ok(false)`
    /// means the session refused it.
    fn add_input(&mut self, device: &DeviceDescriptor) -> Result<bool, BackendError>;

    /// Attach an audio passthrough output.
    fn add_audio_output(&mut self) -> bool;

    async fn start(&mut self);

    async fn stop(&mut self);

    fn is_running(&self) -> bool;
}
