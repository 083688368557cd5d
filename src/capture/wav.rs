//! WAV file playback as a capture source.
//!
//! The file is decoded up front and handed out in packets paced by the wall clock at
//! the file's own sample rate, so the trace looks the same as it would live.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use super::source::{CaptureFault, Packet, SampleSource, StartupStage};

/// Frames per emitted packet, 10 ms at 48 kHz.
const PACKET_FRAMES: usize = 480;

pub struct WavSource {
    /// Interleaved samples normalized to `[-1, 1]`
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
    looping: bool,
    description: String,
    started_at: Option<Instant>,
    /// Frames handed out since start, across loops
    emitted: u64,
}

impl WavSource {
    /// Decodes `path` completely.
    ///
    /// # Errors
    /// - `DeviceUnavailable` if the file cannot be opened
    /// - `FormatUnsupported` if it is not a readable PCM/float WAV or has no frames
    pub fn open(path: &Path, looping: bool) -> Result<Self, CaptureFault> {
        let reader = hound::WavReader::open(path).map_err(|e| match e {
            hound::Error::IoError(io) => CaptureFault::DeviceUnavailable {
                stage: StartupStage::Activate,
                detail: format!("{}: {io}", path.display()),
            },
            other => CaptureFault::FormatUnsupported {
                stage: StartupStage::FormatQuery,
                detail: format!("{}: {other}", path.display()),
            },
        })?;

        let spec = reader.spec();
        let samples = decode(reader).map_err(|e| CaptureFault::FormatUnsupported {
            stage: StartupStage::FormatQuery,
            detail: format!("{}: {e}", path.display()),
        })?;

        tracing::info!(
            "Capture file: {} ({}Hz, {} channels, {} bits {:?})",
            path.display(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format
        );

        Self::from_samples(
            samples,
            spec.channels as usize,
            spec.sample_rate,
            looping,
            format!("file: {}", display_name(path)),
        )
    }

    /// Builds a source over already-decoded interleaved samples.
    pub fn from_samples(
        samples: Vec<f32>,
        channels: usize,
        sample_rate: u32,
        looping: bool,
        description: String,
    ) -> Result<Self, CaptureFault> {
        if channels == 0 || sample_rate == 0 {
            return Err(CaptureFault::FormatUnsupported {
                stage: StartupStage::FormatQuery,
                detail: format!("{channels} channels at {sample_rate}Hz"),
            });
        }
        if samples.len() < channels {
            return Err(CaptureFault::FormatUnsupported {
                stage: StartupStage::FormatQuery,
                detail: "file contains no audio frames".to_string(),
            });
        }

        Ok(Self {
            samples,
            channels,
            sample_rate,
            looping,
            description,
            started_at: None,
            emitted: 0,
        })
    }

    fn total_frames(&self) -> u64 {
        (self.samples.len() / self.channels) as u64
    }

    /// Frames that should have been emitted by now.
    fn due_frames(&self, now: Instant) -> u64 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let due = (now.duration_since(started_at).as_secs_f64() * f64::from(self.sample_rate)) as u64;
        if self.looping {
            due
        } else {
            due.min(self.total_frames())
        }
    }

    fn emit(&mut self, frames: u64, out: &mut Vec<Packet>) {
        let total = self.total_frames();
        let mut remaining = frames;
        while remaining > 0 {
            let position = self.emitted % total;
            let chunk = remaining.min(PACKET_FRAMES as u64).min(total - position);
            let start = position as usize * self.channels;
            let end = start + chunk as usize * self.channels;
            out.push(Packet::from_interleaved(
                self.samples[start..end].iter().copied(),
                self.channels,
            ));
            self.emitted += chunk;
            remaining -= chunk;
        }
    }
}

impl SampleSource for WavSource {
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&mut self) -> Result<(), CaptureFault> {
        self.started_at = Some(Instant::now());
        self.emitted = 0;
        Ok(())
    }

    fn next_packets(&mut self, timeout: Duration, out: &mut Vec<Packet>) -> Result<(), CaptureFault> {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            let pending = self.due_frames(now).saturating_sub(self.emitted);
            if pending > 0 {
                self.emit(pending, out);
                return Ok(());
            }
            if now >= deadline {
                return Ok(());
            }

            let finished = !self.looping && self.emitted >= self.total_frames();
            let wait = if finished || self.started_at.is_none() {
                deadline - now
            } else {
                // Wake when the next frame is due
                let frame = Duration::from_secs_f64(1.0 / f64::from(self.sample_rate));
                frame.min(deadline - now).max(Duration::from_micros(100))
            };
            thread::sleep(wait);
        }
    }

    fn stop(&mut self) {
        tracing::debug!("File playback stopped after {} frames", self.emitted);
        self.started_at = None;
    }
}

fn decode<R: std::io::Read>(mut reader: hound::WavReader<R>) -> Result<Vec<f32>, hound::Error> {
    let spec = reader.spec();
    match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect(),
        hound::SampleFormat::Int => {
            let full_scale = (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect()
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
