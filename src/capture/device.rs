//! Live capture from a `cpal` device.
//!
//! Two flavours share this backend:
//! - physical input: the default input device, or one picked by name or index;
//! - loopback: the default output device opened as an input stream, which captures
//!   what the system is playing. Only hosts that support it (WASAPI) accept this;
//!   elsewhere stream construction fails and capture reports a startup fault.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use std::time::Duration;

use super::queue::{frame_queue, FrameConsumer, FrameProducer};
use super::quiet::suppress_alsa_warnings;
use super::source::{CaptureFault, Packet, SampleSource, StartupStage};

/// Which side of the audio graph to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Input,
    Loopback,
}

/// `cpal` stream feeding a frame queue.
///
/// Every startup stage up to stream construction happens in [`CpalSource::open`];
/// [`SampleSource::start`] only plays the stream. Dropping the source drops the
/// stream, which releases the device.
pub struct CpalSource {
    stream: cpal::Stream,
    queue: FrameConsumer,
    description: String,
    sample_rate: u32,
}

impl CpalSource {
    /// Opens `device_spec` ("default", a device name, or an index) for capture.
    ///
    /// Must run on the thread that reads the source; the stream callback wakes it.
    /// `queue_frames` bounds the frames buffered between callback and reader.
    ///
    /// # Errors
    /// - `DeviceUnavailable` if enumeration fails or the device cannot be found
    /// - `FormatUnsupported` if the device reports no usable stream format
    /// - `ServiceError` if the stream cannot be built
    pub fn open(kind: DeviceKind, device_spec: &str, queue_frames: usize) -> Result<Self, CaptureFault> {
        let (device, supported) = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            let device = find_device(&host, kind, device_spec)?;
            let supported = match kind {
                DeviceKind::Input => device.default_input_config(),
                DeviceKind::Loopback => device.default_output_config(),
            }
            .map_err(|e| CaptureFault::FormatUnsupported {
                stage: StartupStage::FormatQuery,
                detail: e.to_string(),
            })?;
            Ok((device, supported))
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let sample_format = supported.sample_format();

        tracing::info!(
            "Capture device: {} ({:?}, {}Hz, {} channels, {:?})",
            device_name,
            kind,
            sample_rate,
            channels,
            sample_format
        );

        let (producer, queue) = frame_queue(queue_frames);
        let config: cpal::StreamConfig = supported.into();

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, producer),
            SampleFormat::F64 => build_stream::<f64>(&device, &config, channels, producer),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, producer),
            SampleFormat::I32 => build_stream::<i32>(&device, &config, channels, producer),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, producer),
            SampleFormat::U8 => build_stream::<u8>(&device, &config, channels, producer),
            other => {
                return Err(CaptureFault::FormatUnsupported {
                    stage: StartupStage::FormatQuery,
                    detail: format!("sample format {other:?}"),
                })
            }
        }?;

        let kind_label = match kind {
            DeviceKind::Input => "input",
            DeviceKind::Loopback => "loopback",
        };

        Ok(Self {
            stream,
            queue,
            description: format!("{kind_label}: {device_name}"),
            sample_rate,
        })
    }
}

impl SampleSource for CpalSource {
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&mut self) -> Result<(), CaptureFault> {
        self.stream.play().map_err(|e| CaptureFault::ServiceError {
            stage: StartupStage::Start,
            detail: e.to_string(),
        })?;
        tracing::debug!("Audio stream started");
        Ok(())
    }

    fn next_packets(&mut self, timeout: Duration, out: &mut Vec<Packet>) -> Result<(), CaptureFault> {
        self.queue.wait_drain(timeout, out)
    }

    fn stop(&mut self) {
        if let Err(e) = self.stream.pause() {
            tracing::debug!("Failed to pause audio stream: {}", e);
        }
        let dropped = self.queue.dropped_frames();
        if dropped > 0 {
            tracing::warn!("{} audio frames dropped while the capture thread was busy", dropped);
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mut producer: FrameProducer,
) -> Result<cpal::Stream, CaptureFault>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let faults = producer.fault_reporter();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                producer.push_block(data.iter().map(|&s| s.to_sample::<f32>()), channels);
            },
            move |err| {
                tracing::error!("Audio stream error: {}", err);
                faults.fail(err.to_string());
            },
            None,
        )
        .map_err(|e| CaptureFault::ServiceError {
            stage: StartupStage::ClientInit,
            detail: e.to_string(),
        })
}

/// Finds a device by kind and spec: "default", a numeric index, or an exact name.
fn find_device(
    host: &cpal::Host,
    kind: DeviceKind,
    device_spec: &str,
) -> Result<cpal::Device, CaptureFault> {
    if device_spec == "default" {
        let device = match kind {
            DeviceKind::Input => host.default_input_device(),
            DeviceKind::Loopback => host.default_output_device(),
        };
        return device.ok_or_else(|| CaptureFault::DeviceUnavailable {
            stage: StartupStage::Activate,
            detail: "no default device available".to_string(),
        });
    }

    // Indices count only devices that report a name, as `list-devices` prints them.
    let devices: Vec<cpal::Device> = match kind {
        DeviceKind::Input => host.input_devices().map(|d| d.collect::<Vec<_>>()),
        DeviceKind::Loopback => host.output_devices().map(|d| d.collect::<Vec<_>>()),
    }
    .map_err(|e| CaptureFault::DeviceUnavailable {
        stage: StartupStage::Enumerate,
        detail: format!("failed to enumerate devices: {e}"),
    })?
    .into_iter()
    .filter(|d| d.name().is_ok())
    .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices
            .into_iter()
            .nth(index)
            .ok_or_else(|| CaptureFault::DeviceUnavailable {
                stage: StartupStage::Activate,
                detail: format!(
                    "device index {} is out of range (0-{})",
                    index,
                    count.saturating_sub(1)
                ),
            });
    }

    devices
        .into_iter()
        .find(|d| d.name().map(|name| name == device_spec).unwrap_or(false))
        .ok_or_else(|| CaptureFault::DeviceUnavailable {
            stage: StartupStage::Activate,
            detail: format!(
                "device '{device_spec}' not found. Use 'vectorglow list-devices' to see available devices."
            ),
        })
}
