//! Capture permission negotiation.
//!
//! The platform reports a per-kind status and, while undetermined, accepts a
//! single permission request whose decision arrives later through a callback
//! on an arbitrary thread. [`AuthorizationGate`] turns that callback into a
//! one-shot signal the session worker awaits, so no queued work runs while a
//! prompt is outstanding.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::devices::MediaKind;

/// Status the platform reports for a media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    Undetermined,
    Authorized,
    Denied,
}

impl AuthorizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undetermined => "undetermined",
            Self::Authorized => "authorized",
            Self::Denied => "denied",
        }
    }
}

/// Outcome of [`AuthorizationGate::ensure_authorized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Granted,
    Denied,
}

impl AuthDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Invoked exactly once with the user's decision.
pub type DecisionCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Platform permission API.
pub trait AuthorizationBackend: Send + Sync {
    fn current_status(&self, kind: MediaKind) -> AuthorizationStatus;

    /// Prompt the user. `on_decision` fires once, on any thread.
    fn request_access(&self, kind: MediaKind, on_decision: DecisionCallback);
}

/// Tracks authorization per media kind for the life of the process.
///
/// `Authorized` and `Denied` are terminal: once observed they are remembered
/// and the platform is never prompted again for that kind.
pub struct AuthorizationGate {
    backend: Arc<dyn AuthorizationBackend>,
    decided: HashMap<MediaKind, AuthDecision>,
}

impl AuthorizationGate {
    pub fn new(backend: Arc<dyn AuthorizationBackend>) -> Self {
        Self {
            backend,
            decided: HashMap::new(),
        }
    }

    /// Resolve whether `kind` may be captured, prompting at most once.
    ///
    /// Suspends the caller until the platform delivers its decision. A
    /// callback that is dropped without firing counts as a denial.
    pub async fn ensure_authorized(&mut self, kind: MediaKind) -> AuthDecision {
        if let Some(decision) = self.decided.get(&kind) {
            return *decision;
        }

        let decision = match self.backend.current_status(kind) {
            AuthorizationStatus::Authorized => AuthDecision::Granted,
            AuthorizationStatus::Denied => {
                info!("{} capture access previously denied", kind);
                AuthDecision::Denied
            }
            AuthorizationStatus::Undetermined => {
                info!("Requesting {} capture access, holding session work", kind);
                let (tx, rx) = oneshot::channel();
                self.backend.request_access(
                    kind,
                    Box::new(move |granted| {
                        let _ = tx.send(granted);
                    }),
                );

                match rx.await {
                    Ok(true) => {
                        info!("{} capture access granted", kind);
                        AuthDecision::Granted
                    }
                    Ok(false) => {
                        warn!("{} capture access denied by user", kind);
                        AuthDecision::Denied
                    }
                    Err(_) => {
                        warn!(
                            "{} authorization callback dropped without a decision, treating as denied",
                            kind
                        );
                        AuthDecision::Denied
                    }
                }
            }
        };

        self.decided.insert(kind, decision);
        decision
    }

    /// Decision already recorded for `kind`, if any.
    pub fn decision(&self, kind: MediaKind) -> Option<AuthDecision> {
        self.decided.get(&kind).copied()
    }
}
