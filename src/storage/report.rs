//! Mission report output.

use std::path::Path;

use super::persistence::PersistenceError;
use crate::types::MissionReport;

/// Write `report` as pretty-printed JSON to `path`, creating parent
/// directories as needed.
pub fn write_mission_report(path: &Path, report: &MissionReport) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
    std::fs::write(path, json).map_err(|source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(path = %path.display(), "Mission report written");
    Ok(())
}
