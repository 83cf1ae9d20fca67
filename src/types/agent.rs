//! Agent identity and lifecycle phase

use serde::{Deserialize, Serialize};

// ============================================================================
// Agent Spec
// ============================================================================

/// Per-agent mission parameters.
///
/// Created from mission configuration and immutable for the mission lifetime.
/// `index` doubles as the agent's slot in the shared state board and must be
/// unique and contiguous in `0..N`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Stable slot index in `0..N`
    pub index: usize,

    /// Liftoff / landing altitude (m)
    pub base_altitude: f64,

    /// Altitude held before the first consensus round (m)
    pub initial_target: f64,

    /// Low altitude commanded first during liftoff. Defaults to `base_altitude`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liftoff_altitude: Option<f64>,
}

impl AgentSpec {
    pub fn new(index: usize, base_altitude: f64, initial_target: f64) -> Self {
        Self {
            index,
            base_altitude,
            initial_target,
            liftoff_altitude: None,
        }
    }

    /// Altitude commanded during the first liftoff hold.
    pub fn liftoff_altitude(&self) -> f64 {
        self.liftoff_altitude.unwrap_or(self.base_altitude)
    }
}

// ============================================================================
// Agent Phase
// ============================================================================

/// Lifecycle of a single agent loop.
///
/// ```text
/// LiftingOff -> HoldingInitial -> Converging -> Landing -> Done
/// ```
///
/// Fatal per-agent errors jump straight to `Landing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    #[default]
    LiftingOff,
    HoldingInitial,
    Converging,
    Landing,
    Done,
}

impl std::fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentPhase::LiftingOff => write!(f, "Lifting Off"),
            AgentPhase::HoldingInitial => write!(f, "Holding Initial"),
            AgentPhase::Converging => write!(f, "Converging"),
            AgentPhase::Landing => write!(f, "Landing"),
            AgentPhase::Done => write!(f, "Done"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liftoff_altitude_defaults_to_base() {
        let spec = AgentSpec::new(2, 0.15, 0.6);
        assert!((spec.liftoff_altitude() - 0.15).abs() < f64::EPSILON);

        let spec = AgentSpec {
            liftoff_altitude: Some(0.3),
            ..spec
        };
        assert!((spec.liftoff_altitude() - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn phase_serializes_snake_case() {
        let json = serde_json::to_string(&AgentPhase::HoldingInitial).unwrap();
        assert_eq!(json, "\"holding_initial\"");
    }
}
