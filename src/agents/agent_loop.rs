//! Per-agent state machine: lift off, hold, converge, land.
//!
//! ```text
//! LiftingOff -> HoldingInitial -> Converging -> Landing -> Done
//! ```
//!
//! Any fatal error (sensor timeout, lost actuator, board misuse) jumps to
//! `Landing`. Landing always runs and always persists whatever the mission
//! log captured, so a failed agent still leaves its data behind.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::mission_log::MissionLog;
use crate::config::MissionConfig;
use crate::coordination::{BoardError, ConsensusProtocol, RoundOutcome, TickKind, TickScheduler};
use crate::storage::{LogSink, PersistenceError};
use crate::types::{
    AgentFailure, AgentOutcome, AgentPhase, AgentSpec, AltitudeSample, ConsensusRecord, FailureKind,
};
use crate::vehicle::{ActuatorError, SampleEvent, SensorError, Vehicle};

// ============================================================================
// Settings
// ============================================================================

/// Timing shared by every agent loop of one mission.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Converging stops once this much time has passed since the sensor stream opened
    pub mission_duration: Duration,
    pub time_unit_ms: u64,
    /// Consensus every N time units
    pub consensus_period: u64,
    pub sample_hold: Duration,
    pub liftoff_hold: Duration,
    pub climb_hold: Duration,
    pub landing_hold: Duration,
    /// Longest wait for a single sample
    pub sensor_timeout: Duration,
}

impl AgentSettings {
    pub fn from_config(config: &MissionConfig) -> Self {
        let timing = &config.timing;
        Self {
            mission_duration: config.mission.duration(),
            time_unit_ms: timing.time_unit_ms,
            consensus_period: timing.consensus_period,
            sample_hold: timing.sample_hold(),
            liftoff_hold: timing.units(timing.liftoff_hold),
            climb_hold: timing.units(timing.climb_hold),
            landing_hold: timing.units(timing.landing_hold),
            sensor_timeout: config.sensor.timeout(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&MissionConfig::default())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Fatal per-agent errors. Each one lands the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("no altitude sample within {0:?}")]
    SensorTimeout(Duration),

    #[error("sensor failure: {0}")]
    SensorFailure(#[from] SensorError),

    #[error("sensor stream ended")]
    SensorExhausted,

    #[error("actuator failure: {0}")]
    ActuatorFailure(#[from] ActuatorError),

    #[error("mission log not persisted: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("board error: {0}")]
    Board(#[from] BoardError),
}

impl AgentError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AgentError::SensorTimeout(_) => FailureKind::SensorTimeout,
            AgentError::SensorFailure(_) => FailureKind::SensorFailure,
            AgentError::SensorExhausted => FailureKind::SensorExhausted,
            AgentError::ActuatorFailure(_) => FailureKind::ActuatorFailure,
            AgentError::Persistence(_) => FailureKind::Persistence,
            AgentError::Board(_) => FailureKind::Board,
        }
    }

    pub fn to_failure(&self) -> AgentFailure {
        AgentFailure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

// ============================================================================
// Agent Loop
// ============================================================================

/// One agent's mission. Consumed by [`run()`](AgentLoop::run).
pub struct AgentLoop {
    spec: AgentSpec,
    settings: AgentSettings,
    protocol: ConsensusProtocol,
    vehicle: Vehicle,
    sink: Arc<dyn LogSink>,
    cancel: CancellationToken,

    phase: AgentPhase,
    log: MissionLog,
    /// Last agreed target; `initial_target` until a round completes
    target: f64,
    completed_rounds: u64,
    abandoned_rounds: u64,
    computed_rounds: Vec<ConsensusRecord>,
}

impl AgentLoop {
    pub fn new(
        spec: AgentSpec,
        settings: AgentSettings,
        protocol: ConsensusProtocol,
        vehicle: Vehicle,
        sink: Arc<dyn LogSink>,
        cancel: CancellationToken,
    ) -> Self {
        let target = spec.initial_target;
        Self {
            spec,
            settings,
            protocol,
            vehicle,
            sink,
            cancel,
            phase: AgentPhase::default(),
            log: MissionLog::new(),
            target,
            completed_rounds: 0,
            abandoned_rounds: 0,
            computed_rounds: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.spec.index
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    /// Fly the whole mission and report how it went.
    pub async fn run(mut self) -> AgentOutcome {
        let agent = self.spec.index;
        info!(
            agent,
            source = self.vehicle.sensor.source_name(),
            initial_target = self.spec.initial_target,
            "agent starting"
        );

        let mut failure = match self.fly().await {
            Ok(()) => None,
            Err(e) => {
                error!(agent, phase = %self.phase, error = %e, "agent failed, landing");
                Some(e.to_failure())
            }
        };

        self.enter(AgentPhase::Landing);
        if let Err(e) = self.land(failure.is_some()).await {
            error!(agent, error = %e, "landing did not complete cleanly");
            failure.get_or_insert_with(|| e.to_failure());
        }

        let log_persisted = match self.persist() {
            Ok(()) => true,
            Err(e) => {
                error!(agent, error = %e, "mission log lost");
                failure.get_or_insert_with(|| e.to_failure());
                false
            }
        };

        self.enter(AgentPhase::Done);
        info!(
            agent,
            completed_rounds = self.completed_rounds,
            abandoned_rounds = self.abandoned_rounds,
            samples = self.log.len(),
            last_target = self.target,
            ok = failure.is_none(),
            "agent done"
        );

        AgentOutcome {
            index: agent,
            final_phase: self.phase,
            completed_rounds: self.completed_rounds,
            abandoned_rounds: self.abandoned_rounds,
            samples_logged: self.log.len(),
            log_persisted,
            last_target: self.target,
            computed_rounds: self.computed_rounds,
            failure,
        }
    }

    /// LiftingOff through Converging. Returns early, without error, on cancellation.
    async fn fly(&mut self) -> Result<(), AgentError> {
        let agent = self.spec.index;

        self.enter(AgentPhase::LiftingOff);
        for (altitude, duration) in [
            (self.spec.liftoff_altitude(), self.settings.liftoff_hold),
            (self.spec.initial_target, self.settings.climb_hold),
        ] {
            if self.cancel.is_cancelled() {
                return Ok(());
            }
            self.hold(altitude, duration).await?;
        }

        self.enter(AgentPhase::HoldingInitial);
        let deadline = Instant::now() + self.settings.mission_duration;
        let Some(first) = self.next_sample().await? else {
            return Ok(());
        };
        self.record(&first)?;
        debug!(agent, t0_ms = first.timestamp_ms, "time reference fixed");
        self.hold(self.spec.initial_target, self.settings.sample_hold).await?;

        self.enter(AgentPhase::Converging);
        let mut schedule =
            TickScheduler::new(self.settings.time_unit_ms, self.settings.consensus_period);
        loop {
            let Some(sample) = self.next_sample().await? else {
                break;
            };
            let elapsed_ms = self.record(&sample)?;

            if let Some(tick) = schedule.observe(elapsed_ms) {
                match tick.kind {
                    TickKind::Consensus { round } => {
                        self.consensus_round(round, sample.altitude).await?;
                    }
                    TickKind::Hold => {
                        let target = if schedule.before_first_round(&tick) {
                            self.spec.initial_target
                        } else {
                            self.target
                        };
                        self.hold(target, self.settings.sample_hold).await?;
                    }
                }
            }

            if Instant::now() >= deadline {
                info!(agent, rounds = schedule.last_round(), "mission duration reached");
                break;
            }
        }
        Ok(())
    }

    async fn consensus_round(&mut self, round: u64, reading: f64) -> Result<(), AgentError> {
        let agent = self.spec.index;
        match self
            .protocol
            .participate(agent, round, reading, &self.cancel)
            .await?
        {
            RoundOutcome::Completed { target, record } => {
                self.target = target;
                self.completed_rounds += 1;
                if let Some(record) = record {
                    self.computed_rounds.push(record);
                }
                info!(agent, round, target, "consensus round complete");
            }
            RoundOutcome::Abandoned { reason } => {
                self.abandoned_rounds += 1;
                warn!(agent, round, %reason, target = self.target, "round abandoned, holding last target");
            }
        }

        if self.cancel.is_cancelled() {
            return Ok(());
        }
        self.hold(self.target, self.settings.sample_hold).await
    }

    /// Return to base altitude and disarm.
    ///
    /// After a failure both steps are best effort and only logged.
    async fn land(&mut self, after_failure: bool) -> Result<(), AgentError> {
        let agent = self.spec.index;
        let base = self.spec.base_altitude;

        let held = self.hold(base, self.settings.landing_hold).await;
        let stopped = self
            .vehicle
            .actuator
            .stop()
            .await
            .map_err(AgentError::from);

        if after_failure {
            for e in [held.err(), stopped.err()].into_iter().flatten() {
                warn!(agent, error = %e, "best-effort landing step failed");
            }
            return Ok(());
        }
        held?;
        stopped
    }

    fn persist(&self) -> Result<(), AgentError> {
        self.sink.persist(self.spec.index, self.log.rows())?;
        debug!(
            agent = self.spec.index,
            rows = self.log.len(),
            backend = self.sink.backend_name(),
            "mission log persisted"
        );
        Ok(())
    }

    /// Wait for the next sample, bounded by the sensor timeout.
    ///
    /// `Ok(None)` means the mission was cancelled.
    async fn next_sample(&mut self) -> Result<Option<AltitudeSample>, AgentError> {
        let timeout = self.settings.sensor_timeout;
        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                info!(agent = self.spec.index, "cancellation received");
                return Ok(None);
            }
            result = tokio::time::timeout(timeout, self.vehicle.sensor.next_sample()) => result,
        };

        match result.map_err(|_| AgentError::SensorTimeout(timeout))?? {
            SampleEvent::Sample(sample) => {
                trace!(
                    agent = self.spec.index,
                    timestamp_ms = sample.timestamp_ms,
                    altitude = sample.altitude,
                    "sample"
                );
                Ok(Some(sample))
            }
            SampleEvent::Eof => Err(AgentError::SensorExhausted),
        }
    }

    /// Publish the reading to the board and append it to the mission log.
    fn record(&mut self, sample: &AltitudeSample) -> Result<u64, AgentError> {
        self.protocol
            .board()
            .publish_current(self.spec.index, sample.altitude)?;
        Ok(self.log.append(sample))
    }

    async fn hold(&mut self, altitude: f64, duration: Duration) -> Result<(), AgentError> {
        debug!(agent = self.spec.index, altitude, ?duration, "hold");
        self.vehicle.actuator.hold(altitude, duration).await?;
        Ok(())
    }

    fn enter(&mut self, phase: AgentPhase) {
        if self.phase != phase {
            info!(agent = self.spec.index, from = %self.phase, to = %phase, "phase transition");
        }
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::PathGraphAveraging;
    use crate::coordination::{BarrierSettings, SentinelPolicy, SharedStateBoard};
    use crate::storage::InMemoryLogSink;
    use crate::vehicle::{SimulatedVehicle, SimulationSettings};

    fn settings() -> AgentSettings {
        AgentSettings {
            mission_duration: Duration::from_millis(100),
            time_unit_ms: 10,
            consensus_period: 3,
            sample_hold: Duration::from_millis(10),
            liftoff_hold: Duration::from_millis(20),
            climb_hold: Duration::from_millis(50),
            landing_hold: Duration::from_millis(20),
            sensor_timeout: Duration::from_millis(500),
        }
    }

    fn vehicle() -> SimulatedVehicle {
        SimulatedVehicle::new(
            0,
            SimulationSettings {
                sample_period_ms: 2,
                response_time_ms: 0,
                noise_std: 0.0,
                initial_altitude: 0.0,
                seed: Some(1),
            },
        )
    }

    fn solo_loop(
        vehicle: SimulatedVehicle,
        sink: Arc<InMemoryLogSink>,
        cancel: CancellationToken,
    ) -> AgentLoop {
        let protocol = ConsensusProtocol::new(
            Arc::new(SharedStateBoard::new(1, SentinelPolicy::ZeroIsUnset)),
            Arc::new(PathGraphAveraging),
            0,
            BarrierSettings {
                timeout: Duration::from_millis(200),
                poll_interval: Duration::from_millis(1),
            },
        );
        AgentLoop::new(
            AgentSpec::new(0, 0.15, 0.6),
            settings(),
            protocol,
            vehicle.build(),
            sink,
            cancel,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn solo_agent_completes_mission() {
        let sink = Arc::new(InMemoryLogSink::new());
        let outcome = solo_loop(vehicle(), sink.clone(), CancellationToken::new())
            .run()
            .await;

        assert!(outcome.is_success(), "{outcome:?}");
        assert_eq!(outcome.final_phase, AgentPhase::Done);
        assert!(outcome.completed_rounds >= 2, "{outcome:?}");
        assert_eq!(outcome.abandoned_rounds, 0);
        // A lone agent's neighbourhood is itself.
        assert!((outcome.last_target - 0.6).abs() < 1e-9);
        assert_eq!(outcome.computed_rounds.len() as u64, outcome.completed_rounds);

        let rows = sink.rows(0).unwrap();
        assert_eq!(rows.len(), outcome.samples_logged);
        assert_eq!(rows[0].elapsed_secs, 0.0);
        assert!(rows.windows(2).all(|w| w[0].elapsed_secs <= w[1].elapsed_secs));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_sensor_lands_and_keeps_log() {
        let sink = Arc::new(InMemoryLogSink::new());
        let stalled = vehicle().with_sensor_stall_after(Duration::ZERO);
        let outcome = solo_loop(stalled, sink.clone(), CancellationToken::new())
            .run()
            .await;

        let failure = outcome.failure.clone().unwrap();
        assert_eq!(failure.kind, FailureKind::SensorTimeout);
        assert_eq!(outcome.final_phase, AgentPhase::Done);
        assert!(outcome.log_persisted);
        assert_eq!(sink.rows(0).unwrap().len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn actuator_failure_is_reported() {
        let sink = Arc::new(InMemoryLogSink::new());
        let broken = vehicle().with_actuator_failure_after(0);
        let outcome = solo_loop(broken, sink.clone(), CancellationToken::new())
            .run()
            .await;

        assert_eq!(
            outcome.failure.map(|f| f.kind),
            Some(FailureKind::ActuatorFailure)
        );
        assert!(outcome.log_persisted);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_lands_immediately() {
        let sink = Arc::new(InMemoryLogSink::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = solo_loop(vehicle(), sink.clone(), cancel).run().await;

        assert!(outcome.is_success());
        assert_eq!(outcome.samples_logged, 0);
        assert_eq!(outcome.completed_rounds, 0);
    }

    #[test]
    fn settings_follow_config_time_unit() {
        let mut config = MissionConfig::default();
        config.timing.time_unit_ms = 100;
        let s = AgentSettings::from_config(&config);
        assert_eq!(s.liftoff_hold, Duration::from_millis(200));
        assert_eq!(s.climb_hold, Duration::from_millis(500));
        assert_eq!(s.landing_hold, Duration::from_millis(200));
        assert_eq!(s.sample_hold, Duration::from_millis(100));
        assert_eq!(s.mission_duration, Duration::from_secs(45));
    }

    #[test]
    fn error_kinds_map_to_failures() {
        let e = AgentError::SensorTimeout(Duration::from_secs(5));
        assert_eq!(e.kind(), FailureKind::SensorTimeout);
        assert!(e.to_failure().message.contains("no altitude sample"));
        assert_eq!(AgentError::SensorExhausted.kind(), FailureKind::SensorExhausted);
    }
}
