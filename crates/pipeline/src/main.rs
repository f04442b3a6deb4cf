//! Forza Driving-Style Pipeline - Main Entry Point

use anyhow::Context;
use inference_engine::StyleModel;
use metrics_exporter_prometheus::PrometheusBuilder;
use pipeline::{init_logging, IngestionLoop, PipelineConfig, SessionId};
use timeseries_sink::InfluxSink;
use tokio::net::UdpSocket;
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PipelineConfig::load();
    let level = config
        .as_ref()
        .ok()
        .and_then(|c| c.log_level().ok())
        .unwrap_or(Level::INFO);
    init_logging(level)?;

    info!("=== Forza Driving-Style Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    let config = config.inspect_err(|e| error!("{}", e))?;
    let session = SessionId::new();
    info!("Drive session {} started", session);

    let model = StyleModel::load(&config.model_path)
        .with_context(|| format!("loading model {}", config.model_path.display()))?;
    info!(
        "Loaded {} model with {} features",
        model.kind(),
        inference_engine::StyleClassifier::feature_names(&model).len()
    );

    let sink = InfluxSink::connect(config.influx_config()?)
        .await
        .inspect_err(|e| error!("{}", e))?;

    let socket = UdpSocket::bind(("0.0.0.0", config.udp_port))
        .await
        .with_context(|| format!("binding UDP port {}", config.udp_port))?;

    if let Some(port) = config.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("starting Prometheus exporter")?;
        info!("Prometheus metrics on port {}", port);
    }

    let mut ingest = IngestionLoop::new(session, config.loop_settings()?, model, sink)?;
    let stats = ingest
        .run(socket, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Shutdown complete: {:?}", stats);
    Ok(())
}
