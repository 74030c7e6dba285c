use anyhow::Result;
use pipeline::{CrowdSession, CrowdwatchConfig, MockDetector, SyntheticSource};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_with_service("crowdwatch");

    info!("Starting crowdwatch session...");

    let mut config = CrowdwatchConfig::default();
    if let Ok(dir) = std::env::var("CROWDWATCH_LOG_DIR") {
        config.logging.directory = dir.into();
    }
    if let Ok(raw) = std::env::var("CROWDWATCH_CONFIG_JSON") {
        config = CrowdwatchConfig::from_json(serde_json::from_str(&raw)?)?;
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    // Demo wiring: synthetic frames through the mock detector. Real
    // deployments plug camera and model capabilities in at the same seams.
    let source = Box::new(SyntheticSource::new(320, 240, 1_000).with_fps(30.0));
    let detector = Arc::new(MockDetector::new());

    let mut session = CrowdSession::new(config);
    let stats = session.run(source, detector, cancel).await?;

    info!(
        frames = stats.frames_processed,
        dropped = stats.frames_dropped,
        alerts = stats.alerts_fired,
        records = stats.records_written,
        "crowdwatch session finished"
    );

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
    cancel.cancel();
}
