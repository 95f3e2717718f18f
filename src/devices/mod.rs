//! Capture device discovery and selection.
//!
//! The platform performs the actual enumeration; this module only adapts its
//! result into immutable [`DeviceDescriptor`] snapshots and answers selection
//! queries against them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Kind of media a capture device produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device as reported by the platform's enumeration API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDevice {
    pub unique_id: String,
    pub localized_name: String,
    pub manufacturer: String,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Snapshot of a capture device taken at discovery time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub display_name: String,
    pub media_kinds: BTreeSet<MediaKind>,
    pub vendor: String,
}

impl DeviceDescriptor {
    pub fn supports(&self, kind: MediaKind) -> bool {
        self.media_kinds.contains(&kind)
    }
}

impl From<&PlatformDevice> for DeviceDescriptor {
    fn from(device: &PlatformDevice) -> Self {
        let mut media_kinds = BTreeSet::new();
        if device.has_video {
            media_kinds.insert(MediaKind::Video);
        }
        if device.has_audio {
            media_kinds.insert(MediaKind::Audio);
        }

        Self {
            id: device.unique_id.clone(),
            display_name: device.localized_name.clone(),
            media_kinds,
            vendor: device.manufacturer.clone(),
        }
    }
}

/// Platform device enumeration.
///
/// Implementations return a fully materialized list in the platform's
/// enumeration order. An empty list is a valid answer.
pub trait DeviceEnumerator: Send + Sync {
    fn enumerate(&self) -> Vec<PlatformDevice>;
}

/// Injectable selection policy.
pub type DeviceSelector = Arc<dyn Fn(&DeviceDescriptor) -> bool + Send + Sync>;

/// Selector that accepts every device.
pub fn any_device() -> DeviceSelector {
    Arc::new(|_: &DeviceDescriptor| true)
}

pub struct DeviceRegistry {
    enumerator: Arc<dyn DeviceEnumerator>,
}

impl DeviceRegistry {
    pub fn new(enumerator: Arc<dyn DeviceEnumerator>) -> Self {
        Self { enumerator }
    }

    /// Enumerate devices, optionally restricted to one media kind.
    ///
    /// Every call asks the platform again; nothing is cached between calls.
    pub fn discover(&self, kind: Option<MediaKind>) -> Vec<DeviceDescriptor> {
        let devices: Vec<DeviceDescriptor> = self
            .enumerator
            .enumerate()
            .iter()
            .map(DeviceDescriptor::from)
            .filter(|descriptor| kind.map_or(true, |k| descriptor.supports(k)))
            .collect();

        debug!(
            "Discovered {} device(s) for {}",
            devices.len(),
            kind.map_or("any kind", |k| k.as_str())
        );
        devices
    }
}

/// First device in discovery order that satisfies `selector`.
///
/// Later matches are ignored, so the outcome depends only on the order the
/// platform enumerated devices in.
pub fn select_first<'a>(
    devices: &'a [DeviceDescriptor],
    selector: &DeviceSelector,
) -> Option<&'a DeviceDescriptor> {
    devices.iter().find(|device| selector(device))
}
