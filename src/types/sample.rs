//! Sensor samples and mission log rows

use serde::{Deserialize, Serialize};

/// One reading from an agent's altitude sensor stream.
///
/// `timestamp_ms` is monotonic within one stream. Integer milliseconds keep
/// the tick schedule free of floating-point comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudeSample {
    pub timestamp_ms: u64,
    /// Estimated altitude (m)
    pub altitude: f64,
}

impl AltitudeSample {
    pub fn new(timestamp_ms: u64, altitude: f64) -> Self {
        Self {
            timestamp_ms,
            altitude,
        }
    }
}

/// One mission log row: seconds since the agent's first sample, and the
/// altitude measured at that time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRow {
    pub elapsed_secs: f64,
    pub altitude: f64,
}
