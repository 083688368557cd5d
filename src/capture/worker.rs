//! Capture thread and its lifecycle.
//!
//! The worker moves through `Idle → Initializing → Capturing → Stopping → Stopped`.
//! Any startup fault goes from `Initializing` straight to `Stopped`. Stop requests are
//! a compare-and-swap on the shared state, so only the first one has an effect. The
//! source is owned by the thread and dropped on every exit path, which releases the
//! device whichever stage failed.

use anyhow::anyhow;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::source::{CaptureFault, Packet, SampleSource};
use crate::scope::{transform, Point, PointHistory, ViewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CaptureState {
    Idle = 0,
    Initializing = 1,
    Capturing = 2,
    Stopping = 3,
    Stopped = 4,
}

impl CaptureState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Initializing,
            2 => Self::Capturing,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Initializing => write!(f, "initializing"),
            Self::Capturing => write!(f, "capturing"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Timing knobs for the capture loop.
#[derive(Debug, Clone, Copy)]
pub struct CaptureSettings {
    /// Longest wait for a packet before re-checking the stop flag
    pub poll_interval: Duration,
    /// Extra activation attempts after a transient failure
    pub activation_retries: u32,
    /// Delay before the first retry, doubled for each further one
    pub retry_backoff: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            activation_retries: 2,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

/// State shared between the worker handle and the capture thread.
struct Shared {
    state: AtomicU8,
    fault: Mutex<Option<CaptureFault>>,
    source: Mutex<Option<String>>,
    packets: AtomicU64,
    silent_packets: AtomicU64,
    points: AtomicU64,
}

impl Shared {
    fn state(&self) -> CaptureState {
        CaptureState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: CaptureState, to: CaptureState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish(&self) {
        self.state.store(CaptureState::Stopped as u8, Ordering::Release);
    }

    fn record_fault(&self, fault: CaptureFault) {
        tracing::error!("Capture fault: {}", fault);
        *self.fault.lock() = Some(fault);
    }

    /// Sleeps for `duration` unless a stop is requested first. Returns true on stop.
    fn sleep_unless_stopped(&self, duration: Duration, slice: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.state() != CaptureState::Initializing {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(slice.min(deadline - now));
        }
    }
}

/// Point-in-time view of the capture subsystem for logs and the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureReport {
    pub state: CaptureState,
    pub fault: Option<CaptureFault>,
    pub source: Option<String>,
    pub packets: u64,
    pub silent_packets: u64,
    pub points: u64,
}

impl CaptureReport {
    /// Capture gave up and the trace can only show stale points.
    pub fn is_degraded(&self) -> bool {
        self.fault.is_some()
    }
}

/// Handle to the capture thread. Dropping it stops and joins the thread.
pub struct CaptureWorker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureWorker {
    /// Spawns the capture thread.
    ///
    /// `open` runs on the capture thread, so sources that are not `Send` (a live
    /// `cpal::Stream`) never cross threads. It may be called again for retries.
    ///
    /// # Errors
    /// - If the OS refuses to spawn the thread
    pub fn spawn<F>(
        open: F,
        history: Arc<PointHistory>,
        view: Arc<ViewState>,
        settings: CaptureSettings,
    ) -> anyhow::Result<Self>
    where
        F: FnMut() -> Result<Box<dyn SampleSource>, CaptureFault> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: AtomicU8::new(CaptureState::Idle as u8),
            fault: Mutex::new(None),
            source: Mutex::new(None),
            packets: AtomicU64::new(0),
            silent_packets: AtomicU64::new(0),
            points: AtomicU64::new(0),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("vectorglow-capture".to_string())
            .spawn(move || run(open, &thread_shared, &history, &view, settings))
            .map_err(|e| anyhow!("Failed to spawn capture thread: {e}"))?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    pub fn state(&self) -> CaptureState {
        self.shared.state()
    }

    pub fn report(&self) -> CaptureReport {
        CaptureReport {
            state: self.shared.state(),
            fault: self.shared.fault.lock().clone(),
            source: self.shared.source.lock().clone(),
            packets: self.shared.packets.load(Ordering::Relaxed),
            silent_packets: self.shared.silent_packets.load(Ordering::Relaxed),
            points: self.shared.points.load(Ordering::Relaxed),
        }
    }

    /// Asks the capture thread to stop. Returns false if a stop was already requested
    /// or the worker has already stopped.
    pub fn request_stop(&self) -> bool {
        loop {
            let current = self.shared.state();
            let next = match current {
                CaptureState::Idle => CaptureState::Stopped,
                CaptureState::Initializing | CaptureState::Capturing => CaptureState::Stopping,
                CaptureState::Stopping | CaptureState::Stopped => return false,
            };
            if self.shared.transition(current, next) {
                tracing::debug!("Capture stop requested ({} -> {})", current, next);
                return true;
            }
        }
    }

    /// Requests a stop and waits for the capture thread to exit.
    pub fn shutdown(&mut self) {
        self.request_stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Capture thread panicked");
                self.shared.finish();
            }
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<F>(
    mut open: F,
    shared: &Shared,
    history: &PointHistory,
    view: &ViewState,
    settings: CaptureSettings,
) where
    F: FnMut() -> Result<Box<dyn SampleSource>, CaptureFault>,
{
    if !shared.transition(CaptureState::Idle, CaptureState::Initializing) {
        shared.finish();
        return;
    }

    let mut source = match open_with_retry(&mut open, shared, settings) {
        Ok(source) => source,
        Err(fault) => {
            if let Some(fault) = fault {
                shared.record_fault(fault);
            }
            shared.finish();
            return;
        }
    };

    let description = format!("{} @ {}Hz", source.describe(), source.sample_rate());
    *shared.source.lock() = Some(description.clone());

    if let Err(fault) = source.start() {
        shared.record_fault(fault);
        drop(source);
        shared.finish();
        return;
    }

    if shared.transition(CaptureState::Initializing, CaptureState::Capturing) {
        tracing::info!("Capturing from {}", description);
        capture_loop(source.as_mut(), shared, history, view, settings.poll_interval);
    }

    source.stop();
    drop(source);
    shared.finish();

    tracing::info!(
        "Capture stopped: {} packets ({} silent), {} points",
        shared.packets.load(Ordering::Relaxed),
        shared.silent_packets.load(Ordering::Relaxed),
        shared.points.load(Ordering::Relaxed)
    );
}

/// Opens the source, retrying transient activation failures with doubling backoff.
///
/// `Err(None)` means a stop was requested while waiting to retry.
fn open_with_retry<F>(
    open: &mut F,
    shared: &Shared,
    settings: CaptureSettings,
) -> Result<Box<dyn SampleSource>, Option<CaptureFault>>
where
    F: FnMut() -> Result<Box<dyn SampleSource>, CaptureFault>,
{
    let mut backoff = settings.retry_backoff;
    let mut attempt = 0;

    loop {
        match open() {
            Ok(source) => return Ok(source),
            Err(fault) if fault.is_transient() && attempt < settings.activation_retries => {
                attempt += 1;
                tracing::warn!(
                    "Capture activation failed ({}), retry {}/{} in {:?}",
                    fault,
                    attempt,
                    settings.activation_retries,
                    backoff
                );
                if shared.sleep_unless_stopped(backoff, settings.poll_interval) {
                    return Err(None);
                }
                backoff *= 2;
            }
            Err(fault) => return Err(Some(fault)),
        }
    }
}

fn capture_loop(
    source: &mut dyn SampleSource,
    shared: &Shared,
    history: &PointHistory,
    view: &ViewState,
    poll_interval: Duration,
) {
    let mut packets: Vec<Packet> = Vec::new();
    let mut points: Vec<Point> = Vec::new();

    while shared.state() == CaptureState::Capturing {
        packets.clear();
        if let Err(fault) = source.next_packets(poll_interval, &mut packets) {
            shared.record_fault(fault);
            shared.transition(CaptureState::Capturing, CaptureState::Stopping);
            break;
        }

        for packet in &packets {
            shared.packets.fetch_add(1, Ordering::Relaxed);
            if packet.silent {
                shared.silent_packets.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            // View parameters are re-read per frame so an alignment toggle applies
            // from the very next sample.
            points.clear();
            points.extend(
                packet
                    .frames
                    .iter()
                    .map(|&frame| transform(frame, &view.transform_params())),
            );
            shared
                .points
                .fetch_add(points.len() as u64, Ordering::Relaxed);
            history.extend(points.drain(..));
        }
    }
}
