//! Frame acquisition: the source capability seam and the bounded
//! producer/consumer handoff between acquisition and processing.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use common::detections::Frame;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// External frame supplier (camera, file, network stream). `Ok(None)` is
/// the terminal end-of-stream signal, distinct from the queue-level read
/// timeout which just means "try again".
#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Outcome of one queue read.
#[derive(Debug)]
pub enum FrameRead {
    Frame(Frame),
    /// No frame arrived in time; not an error.
    TimedOut,
    /// The producer is gone and the queue is drained.
    Ended,
}

/// Producer half of the frame queue. Offers never block: when the queue is
/// full the incoming frame is dropped and counted, bounding staleness
/// instead of memory.
#[derive(Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<Frame>,
    dropped: Arc<AtomicU64>,
}

impl FrameSender {
    /// Returns whether the frame was enqueued.
    pub fn offer(&self, frame: Frame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                telemetry::metrics::FRAMES_DROPPED.inc();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(sequence = frame.sequence, "frame queue full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer half of the frame queue.
pub struct FrameQueue {
    rx: mpsc::Receiver<Frame>,
    dropped: Arc<AtomicU64>,
}

impl FrameQueue {
    pub async fn recv(&mut self, timeout: Duration) -> FrameRead {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Err(_) => FrameRead::TimedOut,
            Ok(Some(frame)) => FrameRead::Frame(frame),
            Ok(None) => FrameRead::Ended,
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Build the bounded frame handoff between acquisition and processing.
pub fn frame_queue(capacity: usize) -> (FrameSender, FrameQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        FrameSender {
            tx,
            dropped: dropped.clone(),
        },
        FrameQueue { rx, dropped },
    )
}

/// Synthetic frame source for tests and demos: emits a fixed number of
/// solid-color frames, optionally paced to a target FPS.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    total_frames: u64,
    sequence: u64,
    frame_interval: Option<Duration>,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, total_frames: u64) -> Self {
        Self {
            width,
            height,
            total_frames,
            sequence: 0,
            frame_interval: None,
        }
    }

    /// Pace frame delivery to roughly `fps` frames per second.
    pub fn with_fps(mut self, fps: f64) -> Self {
        if fps > 0.0 {
            self.frame_interval = Some(Duration::from_secs_f64(1.0 / fps));
        }
        self
    }
}

#[async_trait]
impl FrameSource for SyntheticSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.sequence >= self.total_frames {
            return Ok(None);
        }
        if let Some(interval) = self.frame_interval {
            tokio::time::sleep(interval).await;
        }

        let frame = Frame {
            sequence: self.sequence,
            timestamp: Utc::now(),
            width: self.width,
            height: self.height,
            data: vec![32; (self.width * self.height * 3) as usize],
        };
        self.sequence += 1;
        Ok(Some(frame))
    }
}
