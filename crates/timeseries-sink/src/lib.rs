//! Time-Series Sink
//!
//! Point model, InfluxDB line protocol encoding, and sinks that accept
//! one point per call with no buffering.

mod influx;
mod memory;
mod point;

pub use influx::{InfluxConfig, InfluxSink};
pub use memory::MemorySink;
pub use point::{FieldValue, Point};

use std::future::Future;
use thiserror::Error;

/// Sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Invalid point: {0}")]
    InvalidPoint(String),
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Write rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Append-only destination for time-series points.
///
/// `write` resolves once the point is acknowledged or has failed.
pub trait TelemetrySink {
    fn write(&self, point: &Point) -> impl Future<Output = Result<(), SinkError>> + Send;
}
