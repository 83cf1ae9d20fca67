//! MissionRunner - launches every agent loop and aggregates the outcome

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::agents::{AgentLoop, AgentSettings};
use crate::config::{ConfigError, MissionConfig};
use crate::consensus::{ConsensusRule, PathGraphAveraging};
use crate::coordination::{ConsensusProtocol, SharedStateBoard};
use crate::storage::LogSink;
use crate::types::{AgentOutcome, MissionReport};
use crate::vehicle::Vehicle;

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("Mission configuration rejected: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("{vehicles} vehicles supplied for {agents} configured agents")]
    VehicleCountMismatch { agents: usize, vehicles: usize },
}

/// Runs one mission to completion.
///
/// Each agent loop is its own tokio task. Loops share one
/// [`SharedStateBoard`] and nothing else; a failing agent lands alone and is
/// reported, never silently dropped.
pub struct MissionRunner {
    config: MissionConfig,
    rule: Arc<dyn ConsensusRule>,
}

impl MissionRunner {
    pub fn new(config: MissionConfig) -> Self {
        Self {
            config,
            rule: Arc::new(PathGraphAveraging),
        }
    }

    /// Replace the consensus rule (path-graph averaging by default).
    pub fn with_rule(mut self, rule: Arc<dyn ConsensusRule>) -> Self {
        self.rule = rule;
        self
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    /// Fly the mission. `vehicles[i]` belongs to the agent with index `i`.
    ///
    /// Returns once every agent has landed. Cancelling `cancel` makes every
    /// agent land early; the report still covers all of them.
    pub async fn run(
        &self,
        vehicles: Vec<Vehicle>,
        sink: Arc<dyn LogSink>,
        cancel: CancellationToken,
    ) -> Result<MissionReport, MissionError> {
        // No agent would compute with a bad designated index or gapped indices.
        self.config.validate()?;

        let agents = self.config.agents_by_index();
        if vehicles.len() != agents.len() {
            return Err(MissionError::VehicleCountMismatch {
                agents: agents.len(),
                vehicles: vehicles.len(),
            });
        }

        let board = Arc::new(SharedStateBoard::new(
            agents.len(),
            self.config.barrier.sentinel,
        ));
        let protocol = ConsensusProtocol::new(
            Arc::clone(&board),
            Arc::clone(&self.rule),
            self.config.mission.designated_computer_index,
            self.config.barrier.settings(),
        );
        let settings = AgentSettings::from_config(&self.config);

        info!(
            mission = %self.config.mission.name,
            agents = agents.len(),
            rule = self.rule.name(),
            designated_computer = protocol.designated_computer(),
            duration_secs = self.config.mission.duration_secs,
            "mission starting"
        );
        let started_at = Utc::now();

        let mut task_set: JoinSet<(usize, Result<AgentOutcome, tokio::task::JoinError>)> =
            JoinSet::new();
        for (spec, vehicle) in agents.into_iter().zip(vehicles) {
            let index = spec.index;
            let agent = AgentLoop::new(
                spec,
                settings.clone(),
                protocol.clone(),
                vehicle,
                Arc::clone(&sink),
                cancel.child_token(),
            );
            // The inner task isolates a panicking agent so its index survives.
            let handle = tokio::spawn(agent.run());
            task_set.spawn(async move { (index, handle.await) });
        }

        let mut outcomes = Vec::with_capacity(task_set.len());
        while let Some(joined) = task_set.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) => {
                    debug!(agent = outcome.index, ok = outcome.is_success(), "agent reported");
                    outcomes.push(outcome);
                }
                Ok((index, Err(e))) => {
                    error!(agent = index, error = %e, "agent task crashed");
                    outcomes.push(AgentOutcome::crashed(index, e.to_string()));
                }
                Err(e) => {
                    // Only reachable if the supervising wrapper itself is aborted.
                    error!(error = %e, "agent supervisor task failed");
                }
            }
        }
        outcomes.sort_by_key(|o| o.index);

        let mut rounds: Vec<_> = outcomes
            .iter()
            .flat_map(|o| o.computed_rounds.iter().cloned())
            .collect();
        rounds.sort_by_key(|r| r.round);

        let snapshot = board.snapshot();
        debug!(?snapshot, "final board state");
        if !snapshot.abandoned.is_empty() {
            warn!(
                abandoned = ?snapshot.abandoned,
                published = snapshot.rounds_published,
                "some consensus rounds were abandoned"
            );
        }

        let report = MissionReport {
            mission: self.config.mission.name.clone(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
            rounds,
        };

        if report.is_success() {
            info!("{}", report.summary());
        } else {
            warn!("{}", report.summary());
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryLogSink;
    use crate::vehicle::{SimulatedVehicle, SimulationSettings};

    fn fast_config(targets: &[f64]) -> MissionConfig {
        let mut config = MissionConfig::default();
        config.agents = targets
            .iter()
            .enumerate()
            .map(|(i, &t)| crate::types::AgentSpec::new(i, 0.15, t))
            .collect();
        config.mission.duration_secs = 0.2;
        config.timing.time_unit_ms = 20;
        config.sensor.sample_period_ms = 5;
        config.sensor.timeout_ms = 1_000;
        config.barrier.timeout_ms = 500;
        config
    }

    fn vehicles(n: usize) -> Vec<Vehicle> {
        (0..n)
            .map(|i| {
                SimulatedVehicle::new(
                    i,
                    SimulationSettings {
                        sample_period_ms: 5,
                        response_time_ms: 0,
                        noise_std: 0.0,
                        initial_altitude: 0.0,
                        seed: Some(3),
                    },
                )
                .build()
            })
            .collect()
    }

    #[tokio::test]
    async fn vehicle_count_must_match_agents() {
        let runner = MissionRunner::new(fast_config(&[0.4, 0.6]));
        let err = runner
            .run(vehicles(3), Arc::new(InMemoryLogSink::new()), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MissionError::VehicleCountMismatch { agents: 2, vehicles: 3 }
        ));
    }

    #[tokio::test]
    async fn designated_computer_out_of_range_is_rejected() {
        let mut config = fast_config(&[0.4, 0.6, 0.3]);
        config.mission.designated_computer_index = 7;
        let sink = Arc::new(InMemoryLogSink::new());

        let err = MissionRunner::new(config)
            .run(vehicles(3), sink.clone(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MissionError::InvalidConfig(_)), "{err}");
        assert!(err.to_string().contains("designated_computer_index"), "{err}");
        assert!(sink.agents().is_empty(), "no agent may fly");
    }

    #[tokio::test]
    async fn gapped_agent_indices_are_rejected() {
        let mut config = fast_config(&[0.4, 0.6, 0.3]);
        config.agents[2].index = 5;

        let err = MissionRunner::new(config)
            .run(vehicles(3), Arc::new(InMemoryLogSink::new()), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("index 5 out of range"), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn two_agents_meet_in_the_middle() {
        let sink = Arc::new(InMemoryLogSink::new());
        let runner = MissionRunner::new(fast_config(&[0.4, 0.8]));
        let report = runner
            .run(vehicles(2), sink.clone(), CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_success(), "{}", report.summary());
        let first = report.round(1).unwrap();
        assert_eq!(first.inputs, vec![0.4, 0.8]);
        assert!(first.outputs.iter().all(|v| (v - 0.6).abs() < 1e-9));
        for outcome in &report.outcomes {
            assert!((outcome.last_target - 0.6).abs() < 1e-9);
        }
        assert_eq!(sink.agents(), vec![0, 1]);
    }
}
