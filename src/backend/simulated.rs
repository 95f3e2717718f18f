//! In-process stand-in for the platform capture and permission APIs.
//!
//! Every call is appended to a call log with its start and finish instants so
//! callers can check ordering and overlap after the fact.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::authorization::{AuthorizationBackend, AuthorizationStatus, DecisionCallback};
use crate::config::SimulationConfig;
use crate::devices::{DeviceDescriptor, DeviceEnumerator, MediaKind, PlatformDevice};
use crate::session::{BackendError, CaptureBackend};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Enumerate,
    RequestAccess(MediaKind),
    BeginConfiguration,
    CommitConfiguration,
    ResetGraph,
    AddInput(String),
    AddAudioOutput,
    Start,
    Stop,
}

impl BackendCall {
    /// Whether the call mutates the capture session.
    pub fn mutates_session(&self) -> bool {
        !matches!(self, Self::Enumerate | Self::RequestAccess(_))
    }
}

#[derive(Debug, Clone)]
pub struct CallRecord {
    pub call: BackendCall,
    pub started: Instant,
    pub finished: Instant,
}

/// How the simulated user answers a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPrompt {
    Immediate(bool),
    Delayed { granted: bool, delay: Duration },
    /// Keep the prompt open until [`SimulatedPlatform::deliver_decision`].
    Held,
}

#[derive(Debug, Clone, Default)]
struct Graph {
    inputs: Vec<String>,
    audio_output: bool,
}

struct State {
    devices: Vec<PlatformDevice>,
    rejected_inputs: HashSet<String>,
    broken_devices: HashSet<String>,
    reject_audio_output: bool,
    start_fails: bool,
    running: bool,
    staged: Option<Graph>,
    committed: Graph,
    authorization: HashMap<MediaKind, AuthorizationStatus>,
    prompt: AuthPrompt,
    held: Vec<(MediaKind, DecisionCallback)>,
    latency: Duration,
    calls: Vec<CallRecord>,
}

struct Inner {
    state: Mutex<State>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: BackendCall, started: Instant) {
        self.state().calls.push(CallRecord {
            call,
            started,
            finished: Instant::now(),
        });
    }

    fn decide(&self, kind: MediaKind, granted: bool, on_decision: DecisionCallback) {
        let status = if granted {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        };
        self.state().authorization.insert(kind, status);
        debug!("Simulated user answered {} prompt: {}", kind, status.as_str());
        on_decision(granted);
    }
}

/// Cheaply cloneable handle; all clones share one simulated platform.
#[derive(Clone)]
pub struct SimulatedPlatform {
    inner: Arc<Inner>,
}

impl SimulatedPlatform {
    /// Platform with the given devices, both kinds already authorized.
    pub fn new(devices: Vec<PlatformDevice>) -> Self {
        let mut authorization = HashMap::new();
        authorization.insert(MediaKind::Video, AuthorizationStatus::Authorized);
        authorization.insert(MediaKind::Audio, AuthorizationStatus::Authorized);

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    devices,
                    rejected_inputs: HashSet::new(),
                    broken_devices: HashSet::new(),
                    reject_audio_output: false,
                    start_fails: false,
                    running: false,
                    staged: None,
                    committed: Graph::default(),
                    authorization,
                    prompt: AuthPrompt::Immediate(true),
                    held: Vec::new(),
                    latency: Duration::ZERO,
                    calls: Vec::new(),
                }),
            }),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        let devices = config
            .devices
            .iter()
            .map(|device| PlatformDevice {
                unique_id: device.id.clone(),
                localized_name: device.name.clone(),
                manufacturer: device.vendor.clone(),
                has_video: device.kinds.contains(&MediaKind::Video),
                has_audio: device.kinds.contains(&MediaKind::Audio),
            })
            .collect();

        let prompt = if config.decision_delay_ms == 0 {
            AuthPrompt::Immediate(config.grant_on_request)
        } else {
            AuthPrompt::Delayed {
                granted: config.grant_on_request,
                delay: Duration::from_millis(config.decision_delay_ms),
            }
        };

        let platform = Self::new(devices)
            .with_authorization(MediaKind::Video, config.video_authorization)
            .with_authorization(MediaKind::Audio, config.audio_authorization)
            .with_prompt(prompt)
            .with_latency(Duration::from_millis(config.operation_latency_ms));
        platform.set_start_fails(config.start_fails);
        platform
    }

    pub fn with_authorization(self, kind: MediaKind, status: AuthorizationStatus) -> Self {
        self.inner.state().authorization.insert(kind, status);
        self
    }

    pub fn with_prompt(self, prompt: AuthPrompt) -> Self {
        self.inner.state().prompt = prompt;
        self
    }

    /// Time `start` and `stop` take to complete.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.inner.state().latency = latency;
        self
    }

    pub fn reject_input(&self, device_id: &str) {
        self.inner.state().rejected_inputs.insert(device_id.to_string());
    }

    pub fn break_device(&self, device_id: &str) {
        self.inner.state().broken_devices.insert(device_id.to_string());
    }

    pub fn reject_audio_output(&self) {
        self.inner.state().reject_audio_output = true;
    }

    /// Make `start` leave the session stopped, as when another process holds the hardware.
    pub fn set_start_fails(&self, fails: bool) {
        self.inner.state().start_fails = fails;
    }

    /// Bring the session up without a `start` call, as when the platform
    /// recovers from contention on its own.
    pub fn recover_session(&self) {
        self.inner.state().running = true;
    }

    /// Answer every held prompt. Returns how many were answered.
    pub fn deliver_decision(&self, granted: bool) -> usize {
        let held = std::mem::take(&mut self.inner.state().held);
        let count = held.len();
        for (kind, on_decision) in held {
            self.inner.decide(kind, granted, on_decision);
        }
        count
    }

    pub fn pending_prompts(&self) -> usize {
        self.inner.state().held.len()
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.inner.state().calls.clone()
    }

    pub fn count(&self, call: &BackendCall) -> usize {
        self.inner
            .state()
            .calls
            .iter()
            .filter(|record| &record.call == call)
            .count()
    }

    /// Inputs in the committed graph, in the order they were added.
    pub fn attached_inputs(&self) -> Vec<String> {
        self.inner.state().committed.inputs.clone()
    }

    pub fn audio_output_attached(&self) -> bool {
        self.inner.state().committed.audio_output
    }
}

impl DeviceEnumerator for SimulatedPlatform {
    fn enumerate(&self) -> Vec<PlatformDevice> {
        let started = Instant::now();
        let devices = self.inner.state().devices.clone();
        self.inner.record(BackendCall::Enumerate, started);
        devices
    }
}

impl AuthorizationBackend for SimulatedPlatform {
    fn current_status(&self, kind: MediaKind) -> AuthorizationStatus {
        self.inner
            .state()
            .authorization
            .get(&kind)
            .copied()
            .unwrap_or(AuthorizationStatus::Undetermined)
    }

    fn request_access(&self, kind: MediaKind, on_decision: DecisionCallback) {
        let started = Instant::now();
        let prompt = self.inner.state().prompt;
        self.inner.record(BackendCall::RequestAccess(kind), started);

        match prompt {
            AuthPrompt::Immediate(granted) => {
                let inner = Arc::clone(&self.inner);
                std::thread::spawn(move || inner.decide(kind, granted, on_decision));
            }
            AuthPrompt::Delayed { granted, delay } => {
                let inner = Arc::clone(&self.inner);
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    inner.decide(kind, granted, on_decision);
                });
            }
            AuthPrompt::Held => {
                self.inner.state().held.push((kind, on_decision));
            }
        }
    }
}

#[async_trait]
impl CaptureBackend for SimulatedPlatform {
    fn begin_configuration(&mut self) {
        let started = Instant::now();
        {
            let mut state = self.inner.state();
            let graph = state.committed.clone();
            state.staged = Some(graph);
        }
        self.inner.record(BackendCall::BeginConfiguration, started);
    }

    fn commit_configuration(&mut self) {
        let started = Instant::now();
        {
            let mut state = self.inner.state();
            if let Some(graph) = state.staged.take() {
                state.committed = graph;
            }
        }
        self.inner.record(BackendCall::CommitConfiguration, started);
    }

    fn reset_graph(&mut self) {
        let started = Instant::now();
        {
            let mut state = self.inner.state();
            let State {
                staged, committed, ..
            } = &mut *state;
            *staged.as_mut().unwrap_or(committed) = Graph::default();
        }
        self.inner.record(BackendCall::ResetGraph, started);
    }

    fn add_input(&mut self, device: &DeviceDescriptor) -> Result<bool, BackendError> {
        let started = Instant::now();
        let result = {
            let mut state = self.inner.state();
            if state.broken_devices.contains(&device.id) {
                Err(BackendError::OpenFailed {
                    device: device.id.clone(),
                    reason: "device could not be opened".to_string(),
                })
            } else if state.rejected_inputs.contains(&device.id) {
                Ok(false)
            } else {
                let State {
                    staged, committed, ..
                } = &mut *state;
                staged
                    .as_mut()
                    .unwrap_or(committed)
                    .inputs
                    .push(device.id.clone());
                Ok(true)
            }
        };
        self.inner
            .record(BackendCall::AddInput(device.id.clone()), started);
        result
    }

    fn add_audio_output(&mut self) -> bool {
        let started = Instant::now();
        let accepted = {
            let mut state = self.inner.state();
            if state.reject_audio_output {
                false
            } else {
                let State {
                    staged, committed, ..
                } = &mut *state;
                staged.as_mut().unwrap_or(committed).audio_output = true;
                true
            }
        };
        self.inner.record(BackendCall::AddAudioOutput, started);
        accepted
    }

    async fn start(&mut self) {
        let started = Instant::now();
        let latency = self.inner.state().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        {
            let mut state = self.inner.state();
            state.running = !state.start_fails;
        }
        self.inner.record(BackendCall::Start, started);
    }

    async fn stop(&mut self) {
        let started = Instant::now();
        let latency = self.inner.state().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.inner.state().running = false;
        self.inner.record(BackendCall::Stop, started);
    }

    fn is_running(&self) -> bool {
        self.inner.state().running
    }
}
