pub mod analysis;
pub mod detections;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
