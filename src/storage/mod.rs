//! Mission log persistence
//!
//! Each agent's mission log is handed to a [`LogSink`] when the agent lands.
//! - `CsvLogSink`: one comma-delimited file per agent, two columns per row
//! - `InMemoryLogSink`: keeps rows in memory for tests and dry runs

mod csv_log;
pub mod persistence;
mod report;

pub use csv_log::CsvLogSink;
pub use persistence::{InMemoryLogSink, LogSink, PersistenceError};
pub use report::write_mission_report;
