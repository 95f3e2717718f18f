//! Scoped configuration transaction.

use tracing::debug;

use super::capture_backend::{BackendError, CaptureBackend};
use crate::devices::DeviceDescriptor;

/// Open configuration batch on a capture session.
///
/// Changes made through the transaction become visible when it is committed,
/// which happens when the value is dropped. Every return path out of a
/// configuration attempt therefore leaves the session committed.
pub struct ConfigurationTransaction<'a> {
    backend: &'a mut dyn CaptureBackend,
}

impl<'a> ConfigurationTransaction<'a> {
    pub fn begin(backend: &'a mut dyn CaptureBackend) -> Self {
        debug!("Opening configuration transaction");
        backend.begin_configuration();
        Self { backend }
    }

    pub fn reset_graph(&mut self) {
        self.backend.reset_graph();
    }

    pub fn add_input(&mut self, device: &DeviceDescriptor) -> Result<bool, BackendError> {
        self.backend.add_input(device)
    }

    pub fn add_audio_output(&mut self) -> bool {
        self.backend.add_audio_output()
    }
}

impl Drop for ConfigurationTransaction<'_> {
    fn drop(&mut self) {
        self.backend.commit_configuration();
        debug!("Configuration transaction committed");
    }
}
