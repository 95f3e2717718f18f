//! Lifecycle phases and the status values published to the foreground.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SetupResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Idle,
    Configuring,
    Ready,
    Failed,
    Running,
    /// `start` was issued but the session did not come up.
    Interrupted,
}

impl LifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Running => "running",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Notification emitted on a status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusEvent {
    Ready,
    Running,
    Stopped,
    NotAuthorized,
    ConfigurationFailed { reason: String },
    StartFailed,
}

impl StatusEvent {
    /// Text suitable for a dismissible banner.
    pub fn message(&self) -> String {
        match self {
            Self::Ready => "Camera is ready".to_string(),
            Self::Running => "Camera is live".to_string(),
            Self::Stopped => "Camera stopped".to_string(),
            Self::NotAuthorized => {
                "Camera access was denied. Allow access in the system privacy settings.".to_string()
            }
            Self::ConfigurationFailed { reason } => {
                format!("Unable to set up the capture session: {reason}")
            }
            Self::StartFailed => {
                "The capture session could not start. The device may be in use by another application; try resuming.".to_string()
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::NotAuthorized | Self::ConfigurationFailed { .. } | Self::StartFailed
        )
    }
}

/// Read-only view of the worker's state, refreshed after every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: LifecyclePhase,
    pub setup_result: Option<SetupResult>,
    pub is_running: bool,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            phase: LifecyclePhase::Idle,
            setup_result: None,
            is_running: false,
            last_error: None,
            updated_at: Utc::now(),
        }
    }
}
