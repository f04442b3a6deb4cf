//! Sliding Time Window
//!
//! Keeps the telemetry frames received within a trailing time window,
//! ordered by capture time.

mod window;

pub use window::{TimeWindow, WindowSnapshot, WindowStats};

use chrono::{DateTime, Utc};
use forza_protocol::TelemetryFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A decoded frame stamped with its receipt time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedFrame {
    /// Wall-clock time the datagram was received (not a packet field)
    pub capture_time: DateTime<Utc>,
    pub frame: TelemetryFrame,
}

impl CapturedFrame {
    pub fn new(frame: TelemetryFrame, capture_time: DateTime<Utc>) -> Self {
        Self {
            capture_time,
            frame,
        }
    }
}

/// Errors constructing a window
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("Window duration must be positive")]
    EmptyDuration,
    #[error("Window duration {0:?} is out of range")]
    OutOfRange(std::time::Duration),
}
