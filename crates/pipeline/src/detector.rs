//! Person detector capability seam.

use anyhow::Result;
use async_trait::async_trait;
use common::detections::{BoundingBox, Frame, FrameDetections};

/// External person-detection capability. Implementations wrap whatever
/// model or service produces boxes; the pipeline only sees this trait.
/// An empty result is a normal value, not an error.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, frame: &Frame) -> Result<FrameDetections>;

    fn name(&self) -> &'static str {
        "detector"
    }
}

/// Deterministic mock detector for tests and demos.
///
/// With a script, frame `sequence` indexes into it (wrapping) to pick the
/// person count; without one, the sequence seeds a pseudo-random 1-3
/// person result. Same frame in, same boxes out.
pub struct MockDetector {
    script: Option<Vec<usize>>,
}

impl MockDetector {
    pub fn new() -> Self {
        Self { script: None }
    }

    /// Produce exactly `script[sequence % len]` people per frame.
    pub fn scripted(script: Vec<usize>) -> Self {
        Self {
            script: Some(script),
        }
    }

    fn count_for(&self, sequence: u64) -> usize {
        match &self.script {
            Some(script) if !script.is_empty() => script[(sequence as usize) % script.len()],
            _ => ((sequence % 3) + 1) as usize,
        }
    }
}

impl Default for MockDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Detector for MockDetector {
    async fn detect(&self, frame: &Frame) -> Result<FrameDetections> {
        let count = self.count_for(frame.sequence);
        let mut boxes = Vec::with_capacity(count);
        let mut scores = Vec::with_capacity(count);

        for i in 0..count {
            let seed = frame
                .sequence
                .wrapping_mul(7)
                .wrapping_add((i as u64).wrapping_mul(13));
            let person_w = (frame.width / 16).max(4);
            let person_h = (frame.height / 8).max(8);
            let max_x = frame.width.saturating_sub(person_w).max(1);
            let max_y = frame.height.saturating_sub(person_h).max(1);
            let x = (seed % u64::from(max_x)) as f32;
            let y = ((seed / 3) % u64::from(max_y)) as f32;

            boxes.push(BoundingBox::new(
                x,
                y,
                x + person_w as f32,
                y + person_h as f32,
            ));
            scores.push(0.5 + ((seed % 45) as f32) / 100.0);
        }

        Ok(FrameDetections::new(boxes, scores))
    }

    fn name(&self) -> &'static str {
        "mock_person_detector"
    }
}
