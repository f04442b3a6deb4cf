//! Decode Error Types

use crate::format::PacketFormat;
use thiserror::Error;

/// Errors that can occur while decoding a telemetry datagram
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Datagram is shorter than the layout requires
    #[error("{format} datagram truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        format: PacketFormat,
        expected: usize,
        actual: usize,
    },

    /// Packet format name not recognised
    #[error("Unknown packet format: {0}")]
    UnknownFormat(String),
}
