//! Lock-free hand-off of stereo frames from an audio callback to the capture thread.
//!
//! The callback side pushes into a `ringbuf` ring without locking or allocating and
//! then unparks the capture thread. The capture side parks with a timeout until
//! frames, a silent block or a fault show up.

use parking_lot::Mutex;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use super::source::{stereo_frames, CaptureFault, Packet};
use crate::scope::SampleFrame;

/// Bookkeeping shared by both ends.
struct Signal {
    consumer: Thread,
    silent_blocks: AtomicU64,
    dropped_frames: AtomicU64,
    faulted: AtomicBool,
    fault: Mutex<Option<String>>,
}

/// Creates a queue holding up to `capacity` frames.
///
/// Must be called on the thread that will wait on the [`FrameConsumer`]; that is the
/// thread the producer wakes.
pub fn frame_queue(capacity: usize) -> (FrameProducer, FrameConsumer) {
    let (producer, consumer) = HeapRb::<SampleFrame>::new(capacity.max(1)).split();
    let signal = Arc::new(Signal {
        consumer: thread::current(),
        silent_blocks: AtomicU64::new(0),
        dropped_frames: AtomicU64::new(0),
        faulted: AtomicBool::new(false),
        fault: Mutex::new(None),
    });
    (
        FrameProducer {
            ring: producer,
            signal: Arc::clone(&signal),
        },
        FrameConsumer {
            ring: consumer,
            signal,
        },
    )
}

/// Callback end of a frame queue.
pub struct FrameProducer {
    ring: HeapProd<SampleFrame>,
    signal: Arc<Signal>,
}

impl FrameProducer {
    /// Pushes one block of interleaved samples with `channels` per frame.
    ///
    /// An all-zero block is only counted. When the ring is full the newest frames
    /// are dropped and counted.
    pub fn push_block<I>(&mut self, samples: I, channels: usize)
    where
        I: IntoIterator<Item = f32>,
        I::IntoIter: Clone,
    {
        let samples = samples.into_iter();
        if samples.clone().all(|s| s == 0.0) {
            self.signal.silent_blocks.fetch_add(1, Ordering::AcqRel);
        } else {
            let mut dropped = 0;
            for frame in stereo_frames(samples, channels) {
                if self.ring.try_push(frame).is_err() {
                    dropped += 1;
                }
            }
            if dropped > 0 {
                self.signal
                    .dropped_frames
                    .fetch_add(dropped, Ordering::Relaxed);
            }
        }
        self.signal.consumer.unpark();
    }

    /// A handle that can report faults from another callback.
    pub fn fault_reporter(&self) -> FaultReporter {
        FaultReporter {
            signal: Arc::clone(&self.signal),
        }
    }
}

/// Reports stream faults into a frame queue, for the cpal error callback.
#[derive(Clone)]
pub struct FaultReporter {
    signal: Arc<Signal>,
}

impl FaultReporter {
    /// Records a runtime fault. The next wait returns it as an error.
    pub fn fail(&self, detail: String) {
        let mut fault = self.signal.fault.lock();
        if fault.is_none() {
            *fault = Some(detail);
            self.signal.faulted.store(true, Ordering::Release);
        }
        drop(fault);
        self.signal.consumer.unpark();
    }
}

/// Capture-thread end of a frame queue.
pub struct FrameConsumer {
    ring: HeapCons<SampleFrame>,
    signal: Arc<Signal>,
}

impl FrameConsumer {
    fn is_idle(&self) -> bool {
        self.ring.is_empty()
            && self.signal.silent_blocks.load(Ordering::Acquire) == 0
            && !self.signal.faulted.load(Ordering::Acquire)
    }

    /// Waits up to `timeout` for anything to arrive, then moves it into `out`.
    ///
    /// Pending frames become one packet; every silent block becomes an empty silent
    /// packet. A recorded fault is returned once.
    pub fn wait_drain(&mut self, timeout: Duration, out: &mut Vec<Packet>) -> Result<(), CaptureFault> {
        let deadline = Instant::now() + timeout;
        while self.is_idle() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }

        if self.signal.faulted.swap(false, Ordering::AcqRel) {
            if let Some(detail) = self.signal.fault.lock().take() {
                return Err(CaptureFault::Stream(detail));
            }
        }

        let silent = self.signal.silent_blocks.swap(0, Ordering::AcqRel);
        out.extend((0..silent).map(|_| Packet::silent()));

        let available = self.ring.occupied_len();
        if available > 0 {
            let mut frames = Vec::with_capacity(available);
            frames.extend(self.ring.pop_iter().take(available));
            out.push(Packet {
                frames,
                silent: false,
            });
        }
        Ok(())
    }

    /// Frames discarded because the capture thread fell behind.
    pub fn dropped_frames(&self) -> u64 {
        self.signal.dropped_frames.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_ring_drops_newest_frames() {
        let (mut producer, mut consumer) = frame_queue(2);
        producer.push_block([0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 2);

        let mut out = Vec::new();
        consumer.wait_drain(Duration::ZERO, &mut out).unwrap();
        assert_eq!(
            out,
            vec![Packet {
                frames: vec![SampleFrame::new(0.1, 0.2), SampleFrame::new(0.3, 0.4)],
                silent: false
            }]
        );
        assert_eq!(consumer.dropped_frames(), 1);
    }

    #[test]
    fn test_silent_block_is_reported_without_frames() {
        let (mut producer, mut consumer) = frame_queue(16);
        producer.push_block([0.0; 8], 2);
        producer.push_block([0.0; 8], 2);
        producer.push_block([0.5, -0.5], 1);

        let mut out = Vec::new();
        consumer.wait_drain(Duration::ZERO, &mut out).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out[0].silent && out[0].frames.is_empty());
        assert!(out[1].silent);
        assert_eq!(
            out[2].frames,
            vec![SampleFrame::new(0.5, 0.5), SampleFrame::new(-0.5, -0.5)]
        );
    }

    #[test]
    fn test_wait_times_out_empty() {
        let (_producer, mut consumer) = frame_queue(4);
        let mut out = Vec::new();
        let started = Instant::now();
        consumer
            .wait_drain(Duration::from_millis(20), &mut out)
            .unwrap();
        assert!(out.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_push_wakes_waiting_consumer() {
        let (mut producer, mut consumer) = frame_queue(64);
        let callback = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push_block([0.5, 0.5], 2);
            producer
        });

        let mut out = Vec::new();
        let started = Instant::now();
        while out.is_empty() && started.elapsed() < Duration::from_secs(5) {
            consumer
                .wait_drain(Duration::from_secs(5), &mut out)
                .unwrap();
        }
        callback.join().unwrap();
        assert_eq!(out.len(), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_fault_is_reported_once() {
        let (producer, mut consumer) = frame_queue(4);
        let reporter = producer.fault_reporter();
        reporter.fail("device removed".to_string());
        reporter.clone().fail("second".to_string());

        let mut out = Vec::new();
        assert_eq!(
            consumer.wait_drain(Duration::ZERO, &mut out),
            Err(CaptureFault::Stream("device removed".to_string()))
        );
        assert!(consumer.wait_drain(Duration::ZERO, &mut out).is_ok());
    }
}
