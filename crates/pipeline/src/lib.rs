//! Session runtime: frame acquisition, the per-frame processing loop, and
//! the capability seams (detector, frame source) the loop is built on.

pub mod config;
pub mod detector;
pub mod session;
pub mod source;

pub use config::CrowdwatchConfig;
pub use detector::{Detector, MockDetector};
pub use session::{CrowdSession, SessionStats};
pub use source::{frame_queue, FrameQueue, FrameRead, FrameSender, FrameSource, SyntheticSource};
