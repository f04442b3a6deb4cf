//! Forza Driving-Style Pipeline
//!
//! UDP telemetry ingestion, windowed feature aggregation, driving-style
//! classification and InfluxDB persistence for one drive session.

pub mod config;
pub mod error;
pub mod ingest;
pub mod points;
pub mod reporter;
pub mod session;

pub use config::{ConfigError, PipelineConfig};
pub use error::PipelineError;
pub use ingest::{IngestionLoop, IterationOutcome, LoopSettings, LoopStats};
pub use session::SessionId;

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
