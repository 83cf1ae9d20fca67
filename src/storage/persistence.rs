//! LogSink trait: pluggable mission log storage

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::types::LogRow;

/// Durable storage for per-agent mission logs, keyed by agent index.
///
/// Implementations must be thread-safe (Send + Sync): every agent loop
/// shares one sink.
pub trait LogSink: Send + Sync {
    /// Store the complete ordered log of one agent, replacing any previous
    /// log for the same index.
    fn persist(&self, agent: usize, rows: &[LogRow]) -> Result<(), PersistenceError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory sink for tests and dry runs. Not durable.
#[derive(Debug, Default)]
pub struct InMemoryLogSink {
    logs: RwLock<BTreeMap<usize, Vec<LogRow>>>,
}

impl InMemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows persisted for `agent`, if any.
    pub fn rows(&self, agent: usize) -> Option<Vec<LogRow>> {
        self.logs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&agent)
            .cloned()
    }

    /// Indices of every agent with a persisted log.
    pub fn agents(&self) -> Vec<usize> {
        self.logs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect()
    }
}

impl LogSink for InMemoryLogSink {
    fn persist(&self, agent: usize, rows: &[LogRow]) -> Result<(), PersistenceError> {
        let mut logs = self
            .logs
            .write()
            .map_err(|e| PersistenceError::Storage(format!("lock poisoned: {e}")))?;
        logs.insert(agent, rows.to_vec());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}
