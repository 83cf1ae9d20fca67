//! Comma-delimited mission log files.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::persistence::{LogSink, PersistenceError};
use crate::types::LogRow;

/// Writes `<dir>/<prefix><index>.csv`: one sample per line,
/// `elapsed_secs,altitude`, no header.
#[derive(Debug, Clone)]
pub struct CsvLogSink {
    dir: PathBuf,
    prefix: String,
}

impl CsvLogSink {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn path_for(&self, agent: usize) -> PathBuf {
        self.dir.join(format!("{}{}.csv", self.prefix, agent))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PersistenceError {
    PersistenceError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl LogSink for CsvLogSink {
    fn persist(&self, agent: usize, rows: &[LogRow]) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let path = self.path_for(agent);
        let file = File::create(&path).map_err(|e| io_error(&path, e))?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            writeln!(writer, "{},{}", row.elapsed_secs, row.altitude)
                .map_err(|e| io_error(&path, e))?;
        }
        writer.flush().map_err(|e| io_error(&path, e))?;

        tracing::debug!(agent, rows = rows.len(), path = %path.display(), "Mission log written");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "csv"
    }
}
