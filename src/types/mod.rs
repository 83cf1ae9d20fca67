//! Shared data structures for the altitude consensus mission
//!
//! - Agents: `AgentSpec` (immutable per-mission identity) and `AgentPhase`
//! - Samples: `AltitudeSample` from the sensor stream, `LogRow` for the mission log
//! - Reports: per-agent `AgentOutcome` and the aggregated `MissionReport`

mod agent;
mod sample;
mod report;

pub use agent::*;
pub use sample::*;
pub use report::*;
