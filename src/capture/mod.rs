//! Audio capture: sample sources and the thread that turns them into points.

pub mod device;
pub mod queue;
pub mod quiet;
pub mod source;
pub mod wav;
pub mod worker;

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{CaptureConfig, SourceKind};

pub use device::{CpalSource, DeviceKind};
pub use source::{CaptureFault, Packet, SampleSource, StartupStage};
pub use wav::WavSource;
pub use worker::{CaptureReport, CaptureSettings, CaptureState, CaptureWorker};

/// Everything needed to open the configured source on the capture thread.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    Device {
        kind: DeviceKind,
        device: String,
        queue_frames: usize,
    },
    File {
        path: PathBuf,
        looping: bool,
    },
}

impl SourceSpec {
    /// # Errors
    /// - `DeviceUnavailable` if the file source is selected without a path
    pub fn from_config(config: &CaptureConfig) -> Result<Self, CaptureFault> {
        Ok(match config.source {
            SourceKind::Input => Self::Device {
                kind: DeviceKind::Input,
                device: config.device.clone(),
                queue_frames: config.queue_frames,
            },
            SourceKind::Loopback => Self::Device {
                kind: DeviceKind::Loopback,
                device: config.device.clone(),
                queue_frames: config.queue_frames,
            },
            SourceKind::File => Self::File {
                path: config.file.clone().ok_or_else(|| CaptureFault::DeviceUnavailable {
                    stage: StartupStage::Enumerate,
                    detail: "no capture file configured".to_string(),
                })?,
                looping: config.loop_file,
            },
        })
    }

    pub fn open(&self) -> Result<Box<dyn SampleSource>, CaptureFault> {
        match self {
            Self::Device {
                kind,
                device,
                queue_frames,
            } => Ok(Box::new(CpalSource::open(*kind, device, *queue_frames)?)),
            Self::File { path, looping } => Ok(Box::new(WavSource::open(path, *looping)?)),
        }
    }
}

impl CaptureSettings {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            activation_retries: config.activation_retries,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_from_config() {
        let mut config = CaptureConfig {
            device: "2".to_string(),
            ..CaptureConfig::default()
        };
        assert_eq!(
            SourceSpec::from_config(&config).unwrap(),
            SourceSpec::Device {
                kind: DeviceKind::Input,
                device: "2".to_string(),
                queue_frames: 32_768
            }
        );

        config.source = SourceKind::Loopback;
        assert!(matches!(
            SourceSpec::from_config(&config).unwrap(),
            SourceSpec::Device {
                kind: DeviceKind::Loopback,
                ..
            }
        ));

        config.source = SourceKind::File;
        assert!(SourceSpec::from_config(&config).is_err());
        config.file = Some(PathBuf::from("a.wav"));
        config.loop_file = false;
        assert_eq!(
            SourceSpec::from_config(&config).unwrap(),
            SourceSpec::File {
                path: PathBuf::from("a.wav"),
                looping: false
            }
        );
    }

    #[test]
    fn test_missing_file_fails_to_open() {
        let spec = SourceSpec::File {
            path: PathBuf::from("/no/such/file.wav"),
            looping: true,
        };
        assert!(matches!(
            spec.open().err(),
            Some(CaptureFault::DeviceUnavailable { .. })
        ));
    }

    #[test]
    fn test_settings_from_config() {
        let config = CaptureConfig {
            poll_interval_ms: 25,
            activation_retries: 5,
            ..CaptureConfig::default()
        };
        let settings = CaptureSettings::from_config(&config);
        assert_eq!(settings.poll_interval, Duration::from_millis(25));
        assert_eq!(settings.activation_retries, 5);
        assert_eq!(settings.retry_backoff, Duration::from_millis(200));
    }
}
