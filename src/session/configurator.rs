//! Builds the capture graph from the selected devices.
//!
//! Every attempt runs inside one [`ConfigurationTransaction`], tears down the
//! previous graph first and either binds everything that was asked for or
//! leaves the committed graph empty.

use tracing::{error, info, warn};

use super::capture_backend::CaptureBackend;
use super::transaction::ConfigurationTransaction;
use super::{BindingRequest, ConfigurationError, SessionBinding, SetupResult};
use crate::devices::{select_first, DeviceDescriptor, DeviceRegistry, DeviceSelector, MediaKind};

pub struct SessionConfigurator {
    registry: DeviceRegistry,
    video_selector: DeviceSelector,
    audio_selector: DeviceSelector,
    binding: Option<SessionBinding>,
}

impl SessionConfigurator {
    pub fn new(
        registry: DeviceRegistry,
        video_selector: DeviceSelector,
        audio_selector: DeviceSelector,
    ) -> Self {
        Self {
            registry,
            video_selector,
            audio_selector,
            binding: None,
        }
    }

    /// The committed binding from the last successful attempt.
    pub fn binding(&self) -> Option<&SessionBinding> {
        self.binding.as_ref()
    }

    /// Run one configuration attempt.
    ///
    /// `setup` carries the outcome of the steps before configuration; anything
    /// other than [`SetupResult::Success`] short-circuits without touching the
    /// session. On return `setup` holds the outcome of this attempt.
    pub fn configure(
        &mut self,
        backend: &mut dyn CaptureBackend,
        request: BindingRequest,
        setup: &mut SetupResult,
    ) -> Result<SessionBinding, ConfigurationError> {
        if *setup != SetupResult::Success {
            warn!("Skipping session configuration, setup result is {}", setup.as_str());
            return Err(ConfigurationError::NotAuthorized);
        }

        self.binding = None;
        let mut transaction = ConfigurationTransaction::begin(backend);
        transaction.reset_graph();

        match self.bind_devices(&mut transaction, request) {
            Ok(binding) => {
                info!(
                    "Session configured: video={:?} audio={:?} audio_output={}",
                    binding.video_input.as_ref().map(|d| d.id.as_str()),
                    binding.audio_input.as_ref().map(|d| d.id.as_str()),
                    binding.audio_output_attached
                );
                *setup = SetupResult::Success;
                self.binding = Some(binding.clone());
                Ok(binding)
            }
            Err(e) => {
                error!("Session configuration failed: {}", e);
                transaction.reset_graph();
                *setup = SetupResult::ConfigurationFailed;
                Err(e)
            }
        }
    }

    fn bind_devices(
        &self,
        transaction: &mut ConfigurationTransaction<'_>,
        request: BindingRequest,
    ) -> Result<SessionBinding, ConfigurationError> {
        let mut binding = SessionBinding::default();

        if request.want_video {
            let device = self.select(MediaKind::Video, &self.video_selector)?;
            Self::bind_input(transaction, &device, MediaKind::Video)?;
            binding.video_input = Some(device);
        }

        if request.want_audio {
            let device = self.select(MediaKind::Audio, &self.audio_selector)?;
            Self::bind_input(transaction, &device, MediaKind::Audio)?;
            if !transaction.add_audio_output() {
                return Err(ConfigurationError::OutputRejected);
            }
            binding.audio_input = Some(device);
            binding.audio_output_attached = true;
        }

        Ok(binding)
    }

    fn select(
        &self,
        kind: MediaKind,
        selector: &DeviceSelector,
    ) -> Result<DeviceDescriptor, ConfigurationError> {
        let devices = self.registry.discover(Some(kind));
        match select_first(&devices, selector) {
            Some(device) => {
                info!("Selected {} device {} ({})", kind, device.display_name, device.id);
                Ok(device.clone())
            }
            None => Err(match kind {
                MediaKind::Video => ConfigurationError::NoVideoDevice,
                MediaKind::Audio => ConfigurationError::NoAudioDevice,
            }),
        }
    }

    fn bind_input(
        transaction: &mut ConfigurationTransaction<'_>,
        device: &DeviceDescriptor,
        kind: MediaKind,
    ) -> Result<(), ConfigurationError> {
        match transaction.add_input(device) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ConfigurationError::InputRejected {
                kind,
                device_id: device.id.clone(),
            }),
            Err(e) => Err(ConfigurationError::DeviceCreationFailed {
                kind,
                device_id: device.id.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, SimulatedPlatform};
    use crate::devices::{any_device, PlatformDevice};
    use std::sync::Arc;

    fn camera(id: &str) -> PlatformDevice {
        PlatformDevice {
            unique_id: id.to_string(),
            localized_name: format!("Camera {id}"),
            manufacturer: "Acme".to_string(),
            has_video: true,
            has_audio: false,
        }
    }

    fn microphone(id: &str) -> PlatformDevice {
        PlatformDevice {
            unique_id: id.to_string(),
            localized_name: format!("Microphone {id}"),
            manufacturer: "Acme".to_string(),
            has_video: false,
            has_audio: true,
        }
    }

    fn configurator(platform: &SimulatedPlatform) -> SessionConfigurator {
        SessionConfigurator::new(
            DeviceRegistry::new(Arc::new(platform.clone())),
            any_device(),
            any_device(),
        )
    }

    #[test]
    fn test_configure_binds_video_and_audio() {
        let platform = SimulatedPlatform::new(vec![camera("cam"), microphone("mic")]);
        let mut backend = platform.clone();
        let mut setup = SetupResult::Success;

        let binding = configurator(&platform)
            .configure(&mut backend, BindingRequest::video_and_audio(), &mut setup)
            .unwrap();

        assert_eq!(setup, SetupResult::Success);
        assert_eq!(binding.video_input.unwrap().id, "cam");
        assert_eq!(binding.audio_input.unwrap().id, "mic");
        assert!(binding.audio_output_attached);
        assert_eq!(platform.attached_inputs(), vec!["cam", "mic"]);
        assert!(platform.audio_output_attached());
    }

    #[test]
    fn test_prior_failure_short_circuits() {
        let platform = SimulatedPlatform::new(vec![camera("cam")]);
        let mut backend = platform.clone();
        let mut setup = SetupResult::NotAuthorized;

        let result =
            configurator(&platform).configure(&mut backend, BindingRequest::video_only(), &mut setup);

        assert_eq!(result.unwrap_err(), ConfigurationError::NotAuthorized);
        assert_eq!(setup, SetupResult::NotAuthorized);
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn test_audio_failure_after_video_is_all_or_nothing() {
        let platform = SimulatedPlatform::new(vec![camera("cam"), microphone("mic")]);
        platform.reject_input("mic");
        let mut backend = platform.clone();
        let mut setup = SetupResult::Success;
        let mut configurator = configurator(&platform);

        let result =
            configurator.configure(&mut backend, BindingRequest::video_and_audio(), &mut setup);

        assert!(matches!(
            result,
            Err(ConfigurationError::InputRejected { kind: MediaKind::Audio, .. })
        ));
        assert_eq!(setup, SetupResult::ConfigurationFailed);
        assert!(configurator.binding().is_none());
        assert!(platform.attached_inputs().is_empty());
    }

    #[test]
    fn test_rejected_video_input_fails_attempt() {
        let platform = SimulatedPlatform::new(vec![camera("cam")]);
        platform.reject_input("cam");
        let mut backend = platform.clone();
        let mut setup = SetupResult::Success;
        let mut configurator = configurator(&platform);

        let result = configurator.configure(&mut backend, BindingRequest::video_only(), &mut setup);

        assert_eq!(
            result.unwrap_err(),
            ConfigurationError::InputRejected {
                kind: MediaKind::Video,
                device_id: "cam".to_string(),
            }
        );
        assert_eq!(setup, SetupResult::ConfigurationFailed);
        assert!(configurator.binding().is_none());
        assert!(platform.attached_inputs().is_empty());
    }

    #[test]
    fn test_device_creation_failure_is_reported() {
        let platform = SimulatedPlatform::new(vec![camera("cam")]);
        platform.break_device("cam");
        let mut backend = platform.clone();
        let mut setup = SetupResult::Success;

        let result =
            configurator(&platform).configure(&mut backend, BindingRequest::video_only(), &mut setup);

        assert!(matches!(
            result,
            Err(ConfigurationError::DeviceCreationFailed { kind: MediaKind::Video, .. })
        ));
        assert_eq!(setup, SetupResult::ConfigurationFailed);
    }

    #[test]
    fn test_missing_audio_device() {
        let platform = SimulatedPlatform::new(vec![camera("cam")]);
        let mut backend = platform.clone();
        let mut setup = SetupResult::Success;

        let result = configurator(&platform).configure(
            &mut backend,
            BindingRequest::video_and_audio(),
            &mut setup,
        );

        assert_eq!(result.unwrap_err(), ConfigurationError::NoAudioDevice);
        assert_eq!(setup, SetupResult::ConfigurationFailed);
    }

    #[test]
    fn test_rejected_audio_output_fails_attempt() {
        let platform = SimulatedPlatform::new(vec![camera("cam"), microphone("mic")]);
        platform.reject_audio_output();
        let mut backend = platform.clone();
        let mut setup = SetupResult::Success;

        let result = configurator(&platform).configure(
            &mut backend,
            BindingRequest::video_and_audio(),
            &mut setup,
        );

        assert_eq!(result.unwrap_err(), ConfigurationError::OutputRejected);
        assert_eq!(setup, SetupResult::ConfigurationFailed);
        assert!(!platform.audio_output_attached());
    }

    #[test]
    fn test_transaction_committed_on_every_path() {
        let platform = SimulatedPlatform::new(Vec::new());
        let mut backend = platform.clone();
        let mut setup = SetupResult::Success;

        let _ =
            configurator(&platform).configure(&mut backend, BindingRequest::video_only(), &mut setup);

        let calls: Vec<BackendCall> = platform.calls().into_iter().map(|c| c.call).collect();
        assert_eq!(calls.first(), Some(&BackendCall::BeginConfiguration));
        assert_eq!(calls.last(), Some(&BackendCall::CommitConfiguration));
    }

    #[test]
    fn test_selector_is_honoured() {
        let platform = SimulatedPlatform::new(vec![camera("front"), camera("back")]);
        let mut backend = platform.clone();
        let mut setup = SetupResult::Success;
        let mut configurator = SessionConfigurator::new(
            DeviceRegistry::new(Arc::new(platform.clone())),
            Arc::new(|d: &DeviceDescriptor| d.id == "back"),
            any_device(),
        );

        let binding = configurator
            .configure(&mut backend, BindingRequest::video_only(), &mut setup)
            .unwrap();

        assert_eq!(binding.video_input.unwrap().id, "back");
        assert_eq!(platform.attached_inputs(), vec!["back"]);
    }

    #[test]
    fn test_reconfiguration_rebuilds_graph() {
        let platform = SimulatedPlatform::new(vec![camera("cam"), microphone("mic")]);
        let mut backend = platform.clone();
        let mut configurator = configurator(&platform);

        let mut setup = SetupResult::Success;
        configurator
            .configure(&mut backend, BindingRequest::video_and_audio(), &mut setup)
            .unwrap();
        let mut setup = SetupResult::Success;
        configurator
            .configure(&mut backend, BindingRequest::video_only(), &mut setup)
            .unwrap();

        assert_eq!(platform.attached_inputs(), vec!["cam"]);
        assert!(!platform.audio_output_attached());
        assert!(configurator.binding().unwrap().audio_input.is_none());
    }
}
