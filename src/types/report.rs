//! Per-agent outcomes and the aggregated mission report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AgentPhase;

// ============================================================================
// Consensus Record
// ============================================================================

/// One published consensus round, recorded by the designated computer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusRecord {
    pub round: u64,
    /// Board `current[]` snapshot the rule was applied to
    pub inputs: Vec<f64>,
    /// Resulting `next[]` vector
    pub outputs: Vec<f64>,
}

// ============================================================================
// Failures
// ============================================================================

/// Category of a fatal per-agent failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SensorTimeout,
    SensorFailure,
    SensorExhausted,
    ActuatorFailure,
    Persistence,
    Board,
    /// The agent task panicked or was aborted before reporting.
    Crashed,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::SensorTimeout => write!(f, "sensor timeout"),
            FailureKind::SensorFailure => write!(f, "sensor failure"),
            FailureKind::SensorExhausted => write!(f, "sensor stream ended"),
            FailureKind::ActuatorFailure => write!(f, "actuator failure"),
            FailureKind::Persistence => write!(f, "log persistence failure"),
            FailureKind::Board => write!(f, "shared board error"),
            FailureKind::Crashed => write!(f, "agent task crashed"),
        }
    }
}

/// Why an agent did not finish cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl std::fmt::Display for AgentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

// ============================================================================
// Agent Outcome
// ============================================================================

/// Result of one agent loop, produced when it reaches `Done`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub index: usize,

    /// Last phase the loop reached (`Done` unless the task crashed)
    pub final_phase: AgentPhase,

    /// Rounds this agent completed with a fresh consensus target
    pub completed_rounds: u64,

    /// Rounds abandoned (barrier timeout, rejection, cancellation)
    pub abandoned_rounds: u64,

    /// Number of rows captured in the mission log
    pub samples_logged: usize,

    /// Whether the mission log reached durable storage
    pub log_persisted: bool,

    /// Last altitude target this agent held during convergence
    pub last_target: f64,

    /// Rounds published by this agent as designated computer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub computed_rounds: Vec<ConsensusRecord>,

    /// Set when the agent terminated on a fatal error
    pub failure: Option<AgentFailure>,
}

impl AgentOutcome {
    /// Outcome for an agent whose task never reported back.
    pub fn crashed(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            final_phase: AgentPhase::LiftingOff,
            completed_rounds: 0,
            abandoned_rounds: 0,
            samples_logged: 0,
            log_persisted: false,
            last_target: 0.0,
            computed_rounds: Vec::new(),
            failure: Some(AgentFailure {
                kind: FailureKind::Crashed,
                message: message.into(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.final_phase == AgentPhase::Done && self.log_persisted
    }
}

// ============================================================================
// Mission Report
// ============================================================================

/// Aggregated result of one mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionReport {
    pub mission: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One outcome per agent, ordered by index
    pub outcomes: Vec<AgentOutcome>,
    /// Every published consensus round, ordered by round number
    pub rounds: Vec<ConsensusRecord>,
}

impl MissionReport {
    /// True when every agent landed and persisted its log.
    pub fn is_success(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(AgentOutcome::is_success)
    }

    /// Agents that did not complete cleanly, with the reason.
    pub fn failed_agents(&self) -> Vec<(usize, String)> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| {
                let reason = match &o.failure {
                    Some(f) => f.to_string(),
                    None => "mission log not persisted".to_string(),
                };
                (o.index, reason)
            })
            .collect()
    }

    pub fn round(&self, round: u64) -> Option<&ConsensusRecord> {
        self.rounds.iter().find(|r| r.round == round)
    }

    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        let failed = self.failed_agents();
        if failed.is_empty() {
            format!(
                "Mission '{}' succeeded: {} agents landed, {} consensus rounds published",
                self.mission,
                self.outcomes.len(),
                self.rounds.len()
            )
        } else {
            let detail: Vec<String> = failed
                .iter()
                .map(|(i, reason)| format!("agent {i} ({reason})"))
                .collect();
            format!(
                "Mission '{}' partially failed: {}/{} agents succeeded; failed: {}",
                self.mission,
                self.outcomes.len() - failed.len(),
                self.outcomes.len(),
                detail.join(", ")
            )
        }
    }
}
