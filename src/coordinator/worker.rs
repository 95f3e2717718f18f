//! The serial session worker.
//!
//! One task owns the capture backend, the authorization gate and the
//! configurator. Requests are taken off the queue one at a time and each runs
//! to completion, including any wait on a permission prompt, before the next
//! is looked at.

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::status::{LifecyclePhase, SessionSnapshot, StatusEvent};
use crate::authorization::AuthorizationGate;
use crate::devices::MediaKind;
use crate::session::{BindingRequest, CaptureBackend, SessionConfigurator, SetupResult};

#[derive(Debug)]
pub(crate) enum LifecycleRequest {
    Initialize,
    BecomeVisible,
    BecomeHidden,
    Resume,
    /// Acknowledged once every earlier request has finished.
    Barrier(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

impl LifecycleRequest {
    fn name(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::BecomeVisible => "become_visible",
            Self::BecomeHidden => "become_hidden",
            Self::Resume => "resume",
            Self::Barrier(_) => "barrier",
            Self::Shutdown(_) => "shutdown",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub binding: BindingRequest,
    pub request_audio_authorization: bool,
}

pub(crate) struct SessionWorker {
    backend: Box<dyn CaptureBackend>,
    gate: AuthorizationGate,
    configurator: SessionConfigurator,
    options: WorkerOptions,
    phase: LifecyclePhase,
    setup_result: Option<SetupResult>,
    last_error: Option<String>,
    failure_reported: bool,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    events_tx: mpsc::UnboundedSender<StatusEvent>,
}

impl SessionWorker {
    pub(crate) fn new(
        backend: Box<dyn CaptureBackend>,
        gate: AuthorizationGate,
        configurator: SessionConfigurator,
        options: WorkerOptions,
        snapshot_tx: watch::Sender<SessionSnapshot>,
        events_tx: mpsc::UnboundedSender<StatusEvent>,
    ) -> Self {
        Self {
            backend,
            gate,
            configurator,
            options,
            phase: LifecyclePhase::Idle,
            setup_result: None,
            last_error: None,
            failure_reported: false,
            snapshot_tx,
            events_tx,
        }
    }

    pub(crate) async fn run(mut self, mut requests: mpsc::UnboundedReceiver<LifecycleRequest>) {
        info!("Session worker started");

        while let Some(request) = requests.recv().await {
            debug!("Session worker handling {}", request.name());
            match request {
                LifecycleRequest::Initialize => self.initialize().await,
                LifecycleRequest::BecomeVisible => self.become_visible().await,
                LifecycleRequest::BecomeHidden => self.become_hidden().await,
                LifecycleRequest::Resume => self.resume().await,
                LifecycleRequest::Barrier(ack) => {
                    let _ = ack.send(());
                }
                LifecycleRequest::Shutdown(ack) => {
                    self.stop_if_running().await;
                    let _ = ack.send(());
                    info!("Session worker shut down");
                    return;
                }
            }
        }

        // Every handle is gone.
        self.stop_if_running().await;
        info!("Session worker exited");
    }

    async fn initialize(&mut self) {
        if self.phase == LifecyclePhase::Running {
            warn!("Ignoring initialize while the session is running, hide it first");
            return;
        }

        if self.backend.is_running() {
            info!("Stopping capture session before reconfiguring");
            self.backend.stop().await;
        }

        let attempt = Uuid::new_v4();
        info!("Configuration attempt {} started", attempt);
        self.phase = LifecyclePhase::Configuring;
        self.setup_result = None;
        self.last_error = None;
        self.failure_reported = false;
        self.publish();

        let mut setup = SetupResult::Success;
        if !self.authorized().await {
            setup = SetupResult::NotAuthorized;
        }

        let request = self.options.binding;
        match self
            .configurator
            .configure(&mut *self.backend, request, &mut setup)
        {
            Ok(_) => {
                info!("Configuration attempt {} succeeded", attempt);
                self.setup_result = Some(SetupResult::Success);
                self.phase = LifecyclePhase::Ready;
                self.emit(StatusEvent::Ready);
            }
            Err(e) => {
                error!("Configuration attempt {} failed: {}", attempt, e);
                self.setup_result = Some(e.setup_result());
                self.last_error = Some(e.to_string());
                self.phase = LifecyclePhase::Failed;
            }
        }

        self.publish();
    }

    async fn authorized(&mut self) -> bool {
        if !self.gate.ensure_authorized(MediaKind::Video).await.is_granted() {
            return false;
        }

        if self.options.binding.want_audio && self.options.request_audio_authorization {
            return self.gate.ensure_authorized(MediaKind::Audio).await.is_granted();
        }

        true
    }

    async fn become_visible(&mut self) {
        match self.phase {
            LifecyclePhase::Ready => {
                info!("Starting capture session");
                self.backend.start().await;
                if self.backend.is_running() {
                    self.phase = LifecyclePhase::Running;
                    self.emit(StatusEvent::Running);
                } else {
                    // Reported only if a resume fails as well.
                    warn!("Capture session did not start, waiting for resume");
                    self.phase = LifecyclePhase::Interrupted;
                    self.last_error = Some("capture session did not start".to_string());
                }
                self.publish();
            }
            LifecyclePhase::Failed => {
                if self.failure_reported {
                    debug!("Setup failure already reported");
                    return;
                }
                let event = match self.setup_result {
                    Some(SetupResult::NotAuthorized) => StatusEvent::NotAuthorized,
                    Some(SetupResult::Success) => StatusEvent::StartFailed,
                    _ => StatusEvent::ConfigurationFailed {
                        reason: self
                            .last_error
                            .clone()
                            .unwrap_or_else(|| "unknown error".to_string()),
                    },
                };
                self.failure_reported = true;
                self.emit(event);
            }
            phase => debug!("become_visible ignored while {}", phase.as_str()),
        }
    }

    async fn become_hidden(&mut self) {
        match self.phase {
            LifecyclePhase::Running => {
                info!("Stopping capture session");
                self.backend.stop().await;
                self.phase = LifecyclePhase::Ready;
                self.emit(StatusEvent::Stopped);
                self.publish();
            }
            LifecyclePhase::Interrupted | LifecyclePhase::Failed => {
                // The session may have come up on its own after a failed start.
                if self.backend.is_running() {
                    self.backend.stop().await;
                }
                if self.phase == LifecyclePhase::Interrupted {
                    self.phase = LifecyclePhase::Ready;
                    self.last_error = None;
                }
                self.publish();
            }
            phase => debug!("become_hidden ignored while {}", phase.as_str()),
        }
    }

    async fn resume(&mut self) {
        if self.phase != LifecyclePhase::Interrupted {
            debug!("resume ignored while {}", self.phase.as_str());
            return;
        }

        info!("Retrying capture session start");
        self.backend.start().await;
        if self.backend.is_running() {
            info!("Capture session resumed");
            self.phase = LifecyclePhase::Running;
            self.last_error = None;
            self.emit(StatusEvent::Running);
        } else {
            warn!("Capture session still not running after resume");
            self.phase = LifecyclePhase::Failed;
            self.last_error = Some("capture session did not start after resume".to_string());
            self.failure_reported = true;
            self.emit(StatusEvent::StartFailed);
        }
        self.publish();
    }

    async fn stop_if_running(&mut self) {
        if self.phase == LifecyclePhase::Running {
            info!("Stopping capture session before exit");
            self.backend.stop().await;
            self.phase = LifecyclePhase::Ready;
            self.emit(StatusEvent::Stopped);
            self.publish();
        }
    }

    fn emit(&self, event: StatusEvent) {
        if event.is_failure() {
            warn!("Status: {}", event.message());
        } else {
            info!("Status: {}", event.message());
        }
        let _ = self.events_tx.send(event);
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            phase: self.phase,
            setup_result: self.setup_result,
            is_running: self.phase == LifecyclePhase::Running && self.backend.is_running(),
            last_error: self.last_error.clone(),
            updated_at: Utc::now(),
        });
    }
}
