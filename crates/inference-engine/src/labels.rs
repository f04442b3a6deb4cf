//! Driving Style Labels

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of labels the classifier scores
pub const LABEL_COUNT: usize = 4;

/// Driving style, indexed by the classifier's output position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrivingStyle {
    Aggressive = 0,
    Assertive = 1,
    Defensive = 2,
    Passive = 3,
}

impl DrivingStyle {
    /// Every label in output-index order
    pub const ALL: [DrivingStyle; LABEL_COUNT] = [
        DrivingStyle::Aggressive,
        DrivingStyle::Assertive,
        DrivingStyle::Defensive,
        DrivingStyle::Passive,
    ];

    /// Label for a classifier output index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Classifier output index
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DrivingStyle::Aggressive => "aggressive",
            DrivingStyle::Assertive => "assertive",
            DrivingStyle::Defensive => "defensive",
            DrivingStyle::Passive => "passive",
        }
    }
}

impl fmt::Display for DrivingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
