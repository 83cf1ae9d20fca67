//! Per-agent mission execution
//!
//! Every vehicle in the swarm runs one [`AgentLoop`]. Loops share nothing but
//! the [`ConsensusProtocol`](crate::coordination::ConsensusProtocol) board
//! and the log sink; each owns its vehicle, its schedule and its
//! [`MissionLog`].

pub mod agent_loop;
pub mod mission_log;

pub use agent_loop::{AgentError, AgentLoop, AgentSettings};
pub use mission_log::MissionLog;
