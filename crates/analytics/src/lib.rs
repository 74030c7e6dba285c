//! Crowd analytics core: per-frame density, spatial distribution, temporal
//! smoothing, trend estimation, anomaly detection, and severity
//! classification. Everything here is synchronous; one [`analyzer::CrowdAnalyzer`]
//! instance owns the state for one video-stream session.

pub mod analyzer;
pub mod anomaly;
pub mod classify;
pub mod config;
pub mod density;
pub mod history;
pub mod smoothing;
mod stats;
pub mod trend;

pub use analyzer::CrowdAnalyzer;
pub use config::{AnalyticsConfig, DensityMethod, ThresholdConfig};
