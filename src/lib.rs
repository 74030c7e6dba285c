//! Crowdwatch: crowd analytics and alerting for person-detection streams.
//!
//! Facade over the workspace crates; the demo binary lives in `pipeline`.

pub use alerting;
pub use analytics;
pub use common;
pub use pipeline;
pub use telemetry;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
