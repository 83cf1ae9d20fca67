//! Append-only per-agent mission log

use crate::types::{AltitudeSample, LogRow};

/// Ordered `(elapsed, altitude)` rows for one agent.
///
/// Owned exclusively by its agent loop; handed to a [`LogSink`] once at
/// mission end.
///
/// [`LogSink`]: crate::storage::LogSink
#[derive(Debug, Default, Clone)]
pub struct MissionLog {
    t0_ms: Option<u64>,
    rows: Vec<LogRow>,
}

impl MissionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample. The first sample fixes `t0` and logs at elapsed 0.
    ///
    /// Returns the sample's elapsed time in milliseconds.
    pub fn append(&mut self, sample: &AltitudeSample) -> u64 {
        let t0 = *self.t0_ms.get_or_insert(sample.timestamp_ms);
        let elapsed_ms = sample.timestamp_ms.saturating_sub(t0);
        #[allow(clippy::cast_precision_loss)]
        let elapsed_secs = elapsed_ms as f64 / 1000.0;
        self.rows.push(LogRow {
            elapsed_secs,
            altitude: sample.altitude,
        });
        elapsed_ms
    }

    pub fn t0_ms(&self) -> Option<u64> {
        self.t0_ms
    }

    pub fn rows(&self) -> &[LogRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_time_zero() {
        let mut log = MissionLog::new();
        assert_eq!(log.append(&AltitudeSample::new(7_250, 0.41)), 0);
        assert_eq!(log.append(&AltitudeSample::new(8_250, 0.43)), 1_000);
        assert_eq!(log.t0_ms(), Some(7_250));
        assert_eq!(
            log.rows(),
            &[
                LogRow {
                    elapsed_secs: 0.0,
                    altitude: 0.41
                },
                LogRow {
                    elapsed_secs: 1.0,
                    altitude: 0.43
                },
            ]
        );
    }

    #[test]
    fn clock_going_backwards_clamps_to_zero() {
        let mut log = MissionLog::new();
        log.append(&AltitudeSample::new(1_000, 0.2));
        assert_eq!(log.append(&AltitudeSample::new(900, 0.2)), 0);
        assert_eq!(log.len(), 2);
    }
}
