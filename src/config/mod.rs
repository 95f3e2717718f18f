use crate::authorization::AuthorizationStatus;
use crate::devices::{DeviceDescriptor, DeviceSelector, MediaKind};
use crate::global;
use crate::session::BindingRequest;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub selection: SelectionConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub want_video: bool,
    pub want_audio: bool,
    /// Also ask for microphone access before configuring.
    pub request_audio_authorization: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub video: DeviceFilter,
    pub audio: DeviceFilter,
}

/// Device filter; every field that is set must match. An empty filter accepts any device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceFilter {
    pub id: Option<String>,
    pub name_contains: Option<String>,
    pub vendor: Option<String>,
}

/// Inventory and behaviour of the simulated platform used by `capturectl run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub video_authorization: AuthorizationStatus,
    pub audio_authorization: AuthorizationStatus,
    pub grant_on_request: bool,
    pub decision_delay_ms: u64,
    pub start_fails: bool,
    pub operation_latency_ms: u64,
    pub devices: Vec<SimulatedDevice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedDevice {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub vendor: String,
    pub kinds: Vec<MediaKind>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            want_video: true,
            want_audio: true,
            request_audio_authorization: true,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            video_authorization: AuthorizationStatus::Undetermined,
            audio_authorization: AuthorizationStatus::Undetermined,
            grant_on_request: true,
            decision_delay_ms: 500,
            start_fails: false,
            operation_latency_ms: 200,
            devices: vec![
                SimulatedDevice {
                    id: "video-0".to_string(),
                    name: "Integrated Camera".to_string(),
                    vendor: "Generic".to_string(),
                    kinds: vec![MediaKind::Video],
                },
                SimulatedDevice {
                    id: "audio-0".to_string(),
                    name: "Built-in Microphone".to_string(),
                    vendor: "Generic".to_string(),
                    kinds: vec![MediaKind::Audio],
                },
            ],
        }
    }
}

impl SessionConfig {
    pub fn binding_request(&self) -> BindingRequest {
        BindingRequest {
            want_video: self.want_video,
            want_audio: self.want_audio,
        }
    }
}

impl DeviceFilter {
    pub fn matches(&self, device: &DeviceDescriptor) -> bool {
        if let Some(id) = &self.id {
            if &device.id != id {
                return false;
            }
        }
        if let Some(fragment) = &self.name_contains {
            if !device
                .display_name
                .to_lowercase()
                .contains(&fragment.to_lowercase())
            {
                return false;
            }
        }
        if let Some(vendor) = &self.vendor {
            if !device.vendor.eq_ignore_ascii_case(vendor) {
                return false;
            }
        }
        true
    }

    pub fn to_selector(&self) -> DeviceSelector {
        let filter = self.clone();
        Arc::new(move |device: &DeviceDescriptor| filter.matches(device))
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn descriptor(id: &str, name: &str, vendor: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            id: id.to_string(),
            display_name: name.to_string(),
            media_kinds: BTreeSet::from([MediaKind::Video]),
            vendor: vendor.to_string(),
        }
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let filter = DeviceFilter::default();
        assert!(filter.matches(&descriptor("a", "Anything", "Anyone")));
    }

    #[test]
    fn test_filter_fields_all_apply() {
        let filter = DeviceFilter {
            id: None,
            name_contains: Some("rear".to_string()),
            vendor: Some("acme".to_string()),
        };
        assert!(filter.matches(&descriptor("1", "Rear Camera", "Acme")));
        assert!(!filter.matches(&descriptor("2", "Front Camera", "Acme")));
        assert!(!filter.matches(&descriptor("3", "Rear Camera", "Other")));

        let selector = filter.to_selector();
        assert!(selector(&descriptor("1", "Rear Camera", "ACME")));
    }

    #[test]
    fn test_filter_by_id() {
        let filter = DeviceFilter {
            id: Some("usb-1".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&descriptor("usb-1", "Webcam", "Logi")));
        assert!(!filter.matches(&descriptor("usb-2", "Webcam", "Logi")));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [session]
            want_audio = false

            [selection.video]
            name_contains = "usb"
            "#,
        )
        .unwrap();

        assert!(config.session.want_video);
        assert!(!config.session.want_audio);
        assert_eq!(config.selection.video.name_contains.as_deref(), Some("usb"));
        assert_eq!(config.selection.audio, DeviceFilter::default());
        assert_eq!(config.simulation.devices.len(), 2);
        assert_eq!(
            config.session.binding_request(),
            BindingRequest::video_only()
        );
    }

    #[test]
    fn test_simulated_devices_parse() {
        let config: Config = toml::from_str(
            r#"
            [simulation]
            video_authorization = "denied"
            start_fails = true

            [[simulation.devices]]
            id = "cam"
            name = "Desk Cam"
            kinds = ["video", "audio"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.simulation.video_authorization,
            AuthorizationStatus::Denied
        );
        assert!(config.simulation.start_fails);
        assert_eq!(config.simulation.devices.len(), 1);
        assert_eq!(config.simulation.devices[0].vendor, "");
        assert_eq!(
            config.simulation.devices[0].kinds,
            vec![MediaKind::Video, MediaKind::Audio]
        );
    }

    #[test]
    fn test_save_and_load_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.session.want_audio = false;
        config.selection.video.vendor = Some("Acme".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(!loaded.session.want_audio);
        assert_eq!(loaded.selection.video.vendor.as_deref(), Some("Acme"));
    }
}
