//! Forza Telemetry Protocol
//!
//! Decodes the "Data Out" UDP datagrams emitted by Forza Motorsport and
//! Forza Horizon into structured telemetry frames. All values are
//! little-endian.

mod error;
mod format;
mod frame;
mod reader;

pub use error::DecodeError;
pub use format::PacketFormat;
pub use frame::{decode, DashData, SledData, TelemetryFrame, Wheels};

/// Largest datagram any supported format produces
pub const MAX_DATAGRAM_BYTES: usize = 2048;
