use anyhow::Result;
use std::sync::Arc;

use super::args::DevicesCliArgs;
use crate::backend::SimulatedPlatform;
use crate::config::Config;
use crate::devices::{select_first, DeviceDescriptor, DeviceRegistry, MediaKind};

pub fn handle_devices_command(config: &Config, args: DevicesCliArgs) -> Result<()> {
    let platform = SimulatedPlatform::from_config(&config.simulation);
    let registry = DeviceRegistry::new(Arc::new(platform));
    let devices = registry.discover(args.kind.map(MediaKind::from));

    if devices.is_empty() {
        println!("No capture devices found");
        return Ok(());
    }

    let video_pick = pick(&registry, MediaKind::Video, config);
    let audio_pick = pick(&registry, MediaKind::Audio, config);

    for device in &devices {
        let kinds: Vec<&str> = device.media_kinds.iter().map(|k| k.as_str()).collect();
        let mut marks = Vec::new();
        if video_pick.as_deref() == Some(device.id.as_str()) {
            marks.push("selected video");
        }
        if audio_pick.as_deref() == Some(device.id.as_str()) {
            marks.push("selected audio");
        }

        println!(
            "{:<20} {:<32} {:<16} {:<12} {}",
            device.id,
            device.display_name,
            device.vendor,
            kinds.join(","),
            marks.join(", ")
        );
    }

    Ok(())
}

fn pick(registry: &DeviceRegistry, kind: MediaKind, config: &Config) -> Option<String> {
    let filter = match kind {
        MediaKind::Video => &config.selection.video,
        MediaKind::Audio => &config.selection.audio,
    };
    let candidates: Vec<DeviceDescriptor> = registry.discover(Some(kind));
    select_first(&candidates, &filter.to_selector()).map(|d| d.id.clone())
}
