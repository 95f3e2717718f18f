//! Capture session lifecycle coordinator.
//!
//! The foreground holds a [`CoordinatorHandle`]. Its control calls only
//! enqueue work and return immediately; the single session worker performs
//! authorization, configuration and start/stop in arrival order. Results come
//! back as [`StatusEvent`]s and through the [`SessionSnapshot`] watch channel.
//!
//! All dependencies are injected via [`CoordinatorParts`].

pub mod status;
mod worker;

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

use crate::authorization::{AuthorizationBackend, AuthorizationGate};
use crate::devices::{DeviceEnumerator, DeviceRegistry, DeviceSelector};
use crate::session::{CaptureBackend, SessionConfigurator};

pub use status::{LifecyclePhase, SessionSnapshot, StatusEvent};
pub use worker::WorkerOptions;

use worker::{LifecycleRequest, SessionWorker};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("session worker is no longer running")]
    WorkerGone,
}

/// Collaborators the worker takes exclusive ownership of.
pub struct CoordinatorParts {
    pub capture: Box<dyn CaptureBackend>,
    pub authorization: Arc<dyn AuthorizationBackend>,
    pub enumerator: Arc<dyn DeviceEnumerator>,
    pub video_selector: DeviceSelector,
    pub audio_selector: DeviceSelector,
    pub options: WorkerOptions,
}

/// Foreground side of the coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    requests: mpsc::UnboundedSender<LifecycleRequest>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

/// Start the session worker on the current tokio runtime.
///
/// Returns the control handle and the status notification stream.
pub fn spawn(parts: CoordinatorParts) -> (CoordinatorHandle, mpsc::UnboundedReceiver<StatusEvent>) {
    let (requests_tx, requests_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

    let configurator = SessionConfigurator::new(
        DeviceRegistry::new(parts.enumerator),
        parts.video_selector,
        parts.audio_selector,
    );
    let worker = SessionWorker::new(
        parts.capture,
        AuthorizationGate::new(parts.authorization),
        configurator,
        parts.options,
        snapshot_tx,
        events_tx,
    );
    tokio::spawn(worker.run(requests_rx));

    (
        CoordinatorHandle {
            requests: requests_tx,
            snapshot: snapshot_rx,
        },
        events_rx,
    )
}

impl CoordinatorHandle {
    /// Authorize and configure the session.
    pub fn initialize(&self) -> Result<(), CoordinatorError> {
        self.enqueue(LifecycleRequest::Initialize)
    }

    /// Start the session if it is ready, or report a setup failure once.
    pub fn become_visible(&self) -> Result<(), CoordinatorError> {
        self.enqueue(LifecycleRequest::BecomeVisible)
    }

    /// Stop the session if it is running.
    pub fn become_hidden(&self) -> Result<(), CoordinatorError> {
        self.enqueue(LifecycleRequest::BecomeHidden)
    }

    /// Retry a start that left the session stopped.
    pub fn resume(&self) -> Result<(), CoordinatorError> {
        self.enqueue(LifecycleRequest::Resume)
    }

    /// Wait until every request enqueued before this call has finished.
    pub async fn settled(&self) -> Result<(), CoordinatorError> {
        let (ack, done) = oneshot::channel();
        self.enqueue(LifecycleRequest::Barrier(ack))?;
        done.await.map_err(|_| CoordinatorError::WorkerGone)
    }

    /// Stop a running session and end the worker after pending requests.
    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        let (ack, done) = oneshot::channel();
        self.enqueue(LifecycleRequest::Shutdown(ack))?;
        done.await.map_err(|_| CoordinatorError::WorkerGone)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that observes every snapshot update.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    fn enqueue(&self, request: LifecycleRequest) -> Result<(), CoordinatorError> {
        self.requests
            .send(request)
            .map_err(|_| CoordinatorError::WorkerGone)
    }
}
