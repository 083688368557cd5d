//! List audio devices usable as capture sources.

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait};

use crate::capture::quiet::suppress_alsa_warnings;
use crate::capture::DeviceKind;

/// One enumerated device, ready to print.
struct DeviceEntry {
    name: String,
    is_default: bool,
    config: Option<(u32, u16)>,
}

/// Lists input devices and output devices (for `--source loopback`).
///
/// # Errors
/// - If the audio host cannot enumerate devices
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let (host_name, inputs, outputs) = suppress_alsa_warnings(|| {
        let host = cpal::default_host();
        let inputs = enumerate(&host, DeviceKind::Input)?;
        let outputs = enumerate(&host, DeviceKind::Loopback)?;
        Ok::<_, anyhow::Error>((host.id().name().to_string(), inputs, outputs))
    })?;

    println!();
    println!(" vectorglow · audio host: {host_name}");
    println!();

    print_section("Input devices (--source input)", &inputs);
    print_section("Output devices (--source loopback)", &outputs);

    println!("Use the ID or the name as `device` in vectorglow.toml or with --device.");
    Ok(())
}

fn enumerate(host: &cpal::Host, kind: DeviceKind) -> anyhow::Result<Vec<DeviceEntry>> {
    let (devices, default_name) = match kind {
        DeviceKind::Input => (
            host.input_devices()
                .map_err(|e| anyhow!("Failed to enumerate input devices: {e}"))?
                .collect::<Vec<_>>(),
            host.default_input_device().and_then(|d| d.name().ok()),
        ),
        DeviceKind::Loopback => (
            host.output_devices()
                .map_err(|e| anyhow!("Failed to enumerate output devices: {e}"))?
                .collect::<Vec<_>>(),
            host.default_output_device().and_then(|d| d.name().ok()),
        ),
    };

    Ok(devices
        .iter()
        // Unnamed devices are skipped here and when resolving an index.
        .filter_map(|device| {
            let name = device.name().ok()?;
            let config = match kind {
                DeviceKind::Input => device.default_input_config(),
                DeviceKind::Loopback => device.default_output_config(),
            }
            .ok()
            .map(|c| (c.sample_rate().0, c.channels()));
            Some(DeviceEntry {
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
                config,
            })
        })
        .collect())
}

fn print_section(title: &str, devices: &[DeviceEntry]) {
    println!("{title}:");
    println!();
    if devices.is_empty() {
        println!("  (none found)");
        println!();
        return;
    }

    for (index, device) in devices.iter().enumerate() {
        let default_indicator = if device.is_default { " [DEFAULT]" } else { "" };
        let config_info = match device.config {
            Some((sample_rate, channels)) => format!("{sample_rate}Hz, {channels} channels"),
            None => "configuration unavailable".to_string(),
        };
        println!("  ID: {index}");
        println!("    Name: {}{}", device.name, default_indicator);
        println!("    Config: {config_info}");
        println!();
    }
}
