use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ==== Pipeline Metrics ====
    pub static ref FRAMES_PROCESSED: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "crowdwatch_frames_processed_total",
                "Total number of frames run through the analytics pipeline",
            ),
            &["status"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref FRAMES_DROPPED: IntCounter = {
        let metric = IntCounter::new(
            "crowdwatch_frames_dropped_total",
            "Frames dropped because the frame queue was full",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref ANALYSIS_LATENCY: Histogram = {
        let metric = Histogram::with_opts(
            HistogramOpts::new(
                "crowdwatch_analysis_latency_seconds",
                "Per-frame analysis plus alert evaluation latency",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    // ==== Alerting Metrics ====
    pub static ref ALERTS_FIRED: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new("crowdwatch_alerts_fired_total", "Alerts fired, by kind"),
            &["kind"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref NOTIFICATIONS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "crowdwatch_notifications_total",
                "Notification channel dispatch outcomes",
            ),
            &["channel", "status"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    // ==== Persistence Metrics ====
    pub static ref RECORD_APPENDS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "crowdwatch_record_appends_total",
                "Data sink append outcomes, by format",
            ),
            &["format", "status"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref ALERT_IMAGES: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "crowdwatch_alert_images_total",
                "Alert image capture outcomes",
            ),
            &["status"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };
}

/// Render all registered metrics in the Prometheus text format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
