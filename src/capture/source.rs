//! Sample source abstraction shared by every capture backend.

use std::fmt;
use std::time::Duration;

use crate::scope::SampleFrame;

/// A run of stereo frames handed from a source to the capture thread.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Packet {
    pub frames: Vec<SampleFrame>,
    /// Set when the backend reports the block as silence. Silent packets are skipped.
    pub silent: bool,
}

impl Packet {
    /// Builds a packet from interleaved samples with `channels` per frame.
    ///
    /// The packet is flagged silent when every sample is exactly zero.
    pub fn from_interleaved<I>(samples: I, channels: usize) -> Self
    where
        I: IntoIterator<Item = f32>,
    {
        let mut silent = true;
        let frames = stereo_frames(
            samples.into_iter().inspect(|&s| silent &= s == 0.0),
            channels,
        )
        .collect();
        Packet { frames, silent }
    }

    /// A silent block, reported without its frames.
    pub fn silent() -> Self {
        Packet {
            frames: Vec::new(),
            silent: true,
        }
    }
}

/// Groups interleaved samples into stereo frames.
///
/// Mono is duplicated to both channels, channels beyond the first two are ignored
/// and a trailing partial frame is dropped.
pub fn stereo_frames<I>(samples: I, channels: usize) -> impl Iterator<Item = SampleFrame>
where
    I: Iterator<Item = f32>,
{
    let channels = channels.max(1);
    let mut frame = [0.0f32; 2];
    samples.enumerate().filter_map(move |(i, sample)| {
        let channel = i % channels;
        if channel < 2 {
            frame[channel] = sample;
        }
        (channel == channels - 1).then(|| {
            let right = if channels == 1 { frame[0] } else { frame[1] };
            SampleFrame::new(frame[0], right)
        })
    })
}

/// Startup step at which a source failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStage {
    /// Host or device enumeration
    Enumerate,
    /// Locating and opening the device
    Activate,
    /// Querying the stream format
    FormatQuery,
    /// Building the capture stream
    ClientInit,
    /// Starting the stream
    Start,
}

impl fmt::Display for StartupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enumerate => write!(f, "enumeration"),
            Self::Activate => write!(f, "activation"),
            Self::FormatQuery => write!(f, "format query"),
            Self::ClientInit => write!(f, "client initialization"),
            Self::Start => write!(f, "start"),
        }
    }
}

/// Why capture could not start or had to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureFault {
    DeviceUnavailable { stage: StartupStage, detail: String },
    FormatUnsupported { stage: StartupStage, detail: String },
    ServiceError { stage: StartupStage, detail: String },
    /// Runtime failure reported by a running stream.
    Stream(String),
}

impl CaptureFault {
    /// Whether retrying activation might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable {
                stage: StartupStage::Activate,
                ..
            }
        )
    }
}

impl fmt::Display for CaptureFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnavailable { stage, detail } => {
                write!(f, "device unavailable during {stage}: {detail}")
            }
            Self::FormatUnsupported { stage, detail } => {
                write!(f, "unsupported format during {stage}: {detail}")
            }
            Self::ServiceError { stage, detail } => {
                write!(f, "audio service error during {stage}: {detail}")
            }
            Self::Stream(detail) => write!(f, "stream error: {detail}"),
        }
    }
}

impl std::error::Error for CaptureFault {}

/// A started or startable stream of stereo packets.
///
/// Sources are opened on the capture thread and never leave it, so they need not be
/// `Send`. Dropping a source releases every resource it holds.
pub trait SampleSource {
    /// Human-readable description for logs and the status overlay.
    fn describe(&self) -> String;

    /// Frames per second delivered by the source.
    fn sample_rate(&self) -> u32;

    fn start(&mut self) -> Result<(), CaptureFault>;

    /// Waits up to `timeout` for packets and appends every available one to `out`.
    ///
    /// Returning with nothing appended is normal; the caller re-checks its stop flag.
    fn next_packets(&mut self, timeout: Duration, out: &mut Vec<Packet>) -> Result<(), CaptureFault>;

    /// Stops delivery. Called once before the source is dropped on a clean shutdown.
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_interleaved_stereo() {
        let packet = Packet::from_interleaved([0.1, 0.2, 0.3, 0.4], 2);
        assert_eq!(
            packet.frames,
            vec![SampleFrame::new(0.1, 0.2), SampleFrame::new(0.3, 0.4)]
        );
        assert!(!packet.silent);
    }

    #[test]
    fn test_from_interleaved_mono_duplicates() {
        let packet = Packet::from_interleaved([0.5, -0.5], 1);
        assert_eq!(
            packet.frames,
            vec![SampleFrame::new(0.5, 0.5), SampleFrame::new(-0.5, -0.5)]
        );
    }

    #[test]
    fn test_from_interleaved_ignores_extra_channels() {
        let packet = Packet::from_interleaved([0.1, 0.2, 9.0, 9.0, 0.3, 0.4, 9.0, 9.0], 4);
        assert_eq!(
            packet.frames,
            vec![SampleFrame::new(0.1, 0.2), SampleFrame::new(0.3, 0.4)]
        );
    }

    #[test]
    fn test_all_zero_packet_is_silent() {
        let packet = Packet::from_interleaved([0.0; 8], 2);
        assert!(packet.silent);
        assert_eq!(packet.frames.len(), 4);
    }

    #[test]
    fn test_stereo_frames_drops_partial_frame() {
        let frames: Vec<_> = stereo_frames([0.1, 0.2, 0.3].into_iter(), 2).collect();
        assert_eq!(frames, vec![SampleFrame::new(0.1, 0.2)]);
    }

    #[test]
    fn test_fault_display_names_stage() {
        let fault = CaptureFault::FormatUnsupported {
            stage: StartupStage::FormatQuery,
            detail: "24-bit".to_string(),
        };
        assert_eq!(fault.to_string(), "unsupported format during format query: 24-bit");
        assert!(!fault.is_transient());
        assert!(CaptureFault::DeviceUnavailable {
            stage: StartupStage::Activate,
            detail: String::new()
        }
        .is_transient());
    }
}
