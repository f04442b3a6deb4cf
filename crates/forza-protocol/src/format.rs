//! Forza Packet Layouts

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Size of the "sled" section shared by every layout
pub const SLED_BYTES: usize = 232;
/// Size of the dash section appended by the extended layouts
pub const DASH_BYTES: usize = 79;
/// Unknown bytes Forza Horizon inserts between sled and dash
const HORIZON_GAP_BYTES: usize = 12;

/// Supported telemetry datagram layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketFormat {
    /// Forza Motorsport 7 "sled" (physics only, 232 bytes)
    Sled,
    /// Forza Motorsport 7 "car dash" (311 bytes)
    Dash,
    /// Forza Horizon 4 / 5 (324 bytes)
    Fh4,
}

impl PacketFormat {
    /// Byte offset of the dash section, if this layout carries one
    pub fn dash_offset(&self) -> Option<usize> {
        match self {
            PacketFormat::Sled => None,
            PacketFormat::Dash => Some(SLED_BYTES),
            PacketFormat::Fh4 => Some(SLED_BYTES + HORIZON_GAP_BYTES),
        }
    }

    /// Minimum datagram length accepted for this layout
    pub fn min_len(&self) -> usize {
        match self.dash_offset() {
            Some(offset) => offset + DASH_BYTES,
            None => SLED_BYTES,
        }
    }

    /// Nominal datagram length sent by the game
    pub fn datagram_len(&self) -> usize {
        match self {
            PacketFormat::Sled => 232,
            PacketFormat::Dash => 311,
            PacketFormat::Fh4 => 324,
        }
    }

    /// Lowercase name used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            PacketFormat::Sled => "sled",
            PacketFormat::Dash => "dash",
            PacketFormat::Fh4 => "fh4",
        }
    }
}

impl Default for PacketFormat {
    fn default() -> Self {
        PacketFormat::Fh4
    }
}

impl fmt::Display for PacketFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PacketFormat {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sled" => Ok(PacketFormat::Sled),
            "dash" | "fm7" => Ok(PacketFormat::Dash),
            // FH5 kept the FH4 layout
            "fh4" | "fh5" => Ok(PacketFormat::Fh4),
            other => Err(DecodeError::UnknownFormat(other.to_string())),
        }
    }
}
