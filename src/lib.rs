//! Swarm Consensus: distributed altitude averaging for small aerial vehicle swarms
//!
//! A fixed set of agents, one per vehicle, each run a control loop that reads
//! its own altitude stream and periodically joins a synchronized consensus
//! round. In each round every agent publishes its reading, one designated
//! agent applies a path-graph averaging rule, and every agent then flies to
//! its entry in the result. Repeated rounds drive the swarm toward a common
//! altitude.
//!
//! ## Architecture
//!
//! - **Shared State Board** (`coordination::board`): round-stamped `current[]`
//!   and `next[]` vectors guarded by one mutex
//! - **Consensus Engine** (`consensus`): pure path-graph averaging rule
//! - **Barrier Protocol** (`coordination::barrier`): arrive, Barrier A,
//!   compute, Barrier B, with bounded polling and round abandonment
//! - **Agent Loop** (`agents`): `LiftingOff -> HoldingInitial -> Converging -> Landing -> Done`
//! - **Mission Runner** (`mission`): one tokio task per agent, aggregated report
//! - **Storage** (`storage`): per-agent CSV mission logs and the JSON report
//! - **Vehicle** (`vehicle`): sensor / actuator seams plus a simulated vehicle

pub mod agents;
pub mod config;
pub mod consensus;
pub mod coordination;
pub mod mission;
pub mod storage;
pub mod types;
pub mod vehicle;

// Re-export mission configuration
pub use config::{ConfigError, MissionConfig};

// Re-export commonly used types
pub use types::{
    AgentFailure, AgentOutcome, AgentPhase, AgentSpec, AltitudeSample, ConsensusRecord,
    FailureKind, LogRow, MissionReport,
};

// Re-export the consensus core
pub use consensus::{consensus, ConsensusError, ConsensusRule, PathGraphAveraging, Topology};
pub use coordination::{
    AbandonReason, BarrierSettings, BoardError, ConsensusProtocol, RoundOutcome, SentinelPolicy,
    SharedStateBoard, TickScheduler,
};

// Re-export agents and orchestration
pub use agents::{AgentError, AgentLoop, AgentSettings, MissionLog};
pub use mission::{MissionError, MissionRunner};

// Re-export collaborators
pub use storage::{CsvLogSink, InMemoryLogSink, LogSink, PersistenceError};
pub use vehicle::{Actuator, AltitudeSensor, SimulatedVehicle, Vehicle};
