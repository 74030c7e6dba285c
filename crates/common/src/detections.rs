//! Detection contracts shared between the detector boundary, the analytics
//! core, and the alerting pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates, corner form.
///
/// A box is valid when `x2 > x1` and `y2 > y1`; degenerate boxes must be
/// discarded at the boundary (see [`sanitize_detections`]) before they reach
/// the analytics core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Center point of the box.
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x1 + self.x2) / 2.0,
            f64::from(self.y1 + self.y2) / 2.0,
        )
    }
}

/// Person detections for a single frame, as handed over by a detector.
///
/// `boxes` and `scores` are parallel sequences; an empty result is a normal
/// value (nobody in view), not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameDetections {
    pub boxes: Vec<BoundingBox>,
    pub scores: Vec<f32>,
    pub person_count: usize,
}

impl FrameDetections {
    pub fn new(boxes: Vec<BoundingBox>, scores: Vec<f32>) -> Self {
        let person_count = boxes.len();
        Self {
            boxes,
            scores,
            person_count,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// Drop degenerate boxes (and their scores) before the core sees them.
///
/// Keeps the parallel-sequence invariant and recomputes `person_count` from
/// the surviving boxes.
pub fn sanitize_detections(detections: FrameDetections) -> FrameDetections {
    let FrameDetections { boxes, scores, .. } = detections;
    let mut kept_boxes = Vec::with_capacity(boxes.len());
    let mut kept_scores = Vec::with_capacity(scores.len());
    let mut dropped = 0usize;

    for (i, b) in boxes.into_iter().enumerate() {
        if b.is_valid() {
            kept_boxes.push(b);
            kept_scores.push(scores.get(i).copied().unwrap_or(0.0));
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, "discarded degenerate bounding boxes");
    }

    FrameDetections::new(kept_boxes, kept_scores)
}

/// Raw video frame as delivered by a frame source.
///
/// `data` holds packed RGB bytes (`width * height * 3`); the analytics core
/// never inspects pixels, only the alert image writer does.
#[derive(Debug, Clone)]
pub struct Frame {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_center_and_validity() {
        let b = BoundingBox::new(100.0, 100.0, 150.0, 200.0);
        assert!(b.is_valid());
        assert_eq!(b.center(), (125.0, 150.0));
        assert_eq!(b.width(), 50.0);
        assert_eq!(b.height(), 100.0);

        let degenerate = BoundingBox::new(150.0, 100.0, 150.0, 200.0);
        assert!(!degenerate.is_valid());
    }

    #[test]
    fn test_sanitize_drops_degenerate_boxes() {
        let detections = FrameDetections::new(
            vec![
                BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                BoundingBox::new(50.0, 50.0, 40.0, 60.0), // inverted x
                BoundingBox::new(20.0, 20.0, 30.0, 30.0),
            ],
            vec![0.9, 0.8, 0.7],
        );

        let clean = sanitize_detections(detections);
        assert_eq!(clean.person_count, 2);
        assert_eq!(clean.boxes.len(), clean.scores.len());
        assert_eq!(clean.scores, vec![0.9, 0.7]);
    }

    #[test]
    fn test_sanitize_empty_is_normal() {
        let clean = sanitize_detections(FrameDetections::empty());
        assert!(clean.is_empty());
        assert_eq!(clean.person_count, 0);
    }
}
