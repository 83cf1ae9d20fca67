//! Barrier / elect / compute / broadcast cycle for one consensus round.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::board::{AbandonReason, BoardError, Gate, SharedStateBoard};
use crate::consensus::ConsensusRule;
use crate::types::ConsensusRecord;

/// Bounded cooperative polling parameters for both barriers.
#[derive(Debug, Clone, Copy)]
pub struct BarrierSettings {
    /// Longest wait at either barrier before the round is abandoned
    pub timeout: Duration,
    /// Sleep between checks
    pub poll_interval: Duration,
}

impl Default for BarrierSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(crate::config::defaults::BARRIER_TIMEOUT_MS),
            poll_interval: Duration::from_millis(crate::config::defaults::BARRIER_POLL_INTERVAL_MS),
        }
    }
}

/// How one agent's participation in a round ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// Barrier B opened; `target` is this agent's `next[i]`.
    Completed {
        target: f64,
        /// Present only for the designated computer
        record: Option<ConsensusRecord>,
    },
    /// The round was abandoned; hold the last known target.
    Abandoned { reason: AbandonReason },
}

/// Runs the round protocol against a shared board.
///
/// Cloned into every agent loop; all clones share the same board and rule.
#[derive(Clone)]
pub struct ConsensusProtocol {
    board: Arc<SharedStateBoard>,
    rule: Arc<dyn ConsensusRule>,
    designated_computer: usize,
    settings: BarrierSettings,
}

impl std::fmt::Debug for ConsensusProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusProtocol")
            .field("rule", &self.rule.name())
            .field("designated_computer", &self.designated_computer)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ConsensusProtocol {
    pub fn new(
        board: Arc<SharedStateBoard>,
        rule: Arc<dyn ConsensusRule>,
        designated_computer: usize,
        settings: BarrierSettings,
    ) -> Self {
        Self {
            board,
            rule,
            designated_computer,
            settings,
        }
    }

    pub fn board(&self) -> &Arc<SharedStateBoard> {
        &self.board
    }

    pub fn designated_computer(&self) -> usize {
        self.designated_computer
    }

    pub fn is_computer(&self, agent: usize) -> bool {
        agent == self.designated_computer
    }

    /// Take part in consensus round `round` with this agent's latest reading.
    ///
    /// Returns `Err` only for board misuse (bad index / size). Timeouts,
    /// cancellation and rejected input abandon the round and come back as
    /// [`RoundOutcome::Abandoned`].
    pub async fn participate(
        &self,
        agent: usize,
        round: u64,
        reading: f64,
        cancel: &CancellationToken,
    ) -> Result<RoundOutcome, BoardError> {
        self.board.arrive(agent, round, reading)?;

        // Barrier A
        let current = match self.wait(cancel, || self.board.current_gate(round)).await {
            Ok(values) => values,
            Err(reason) => return Ok(self.abandon(agent, round, reason, "A")),
        };

        let record = if self.is_computer(agent) {
            self.board.reset_next();
            info!(agent, round, rule = self.rule.name(), "running consensus");
            match self.rule.apply(&current) {
                Ok(outputs) => {
                    self.board.publish_next_vector(&outputs, round)?;
                    debug!(agent, round, ?current, ?outputs, "consensus published");
                    Some(ConsensusRecord {
                        round,
                        inputs: current,
                        outputs,
                    })
                }
                Err(e) => {
                    warn!(agent, round, error = %e, "consensus input rejected");
                    return Ok(self.abandon(agent, round, AbandonReason::Rejected, "compute"));
                }
            }
        } else {
            None
        };

        // Barrier B
        let next = match self.wait(cancel, || self.board.next_gate(round)).await {
            Ok(values) => values,
            Err(reason) => return Ok(self.abandon(agent, round, reason, "B")),
        };

        match next.get(agent) {
            Some(&target) => Ok(RoundOutcome::Completed { target, record }),
            None => Err(BoardError::IndexOutOfRange {
                index: agent,
                len: next.len(),
            }),
        }
    }

    fn abandon(&self, agent: usize, round: u64, reason: AbandonReason, stage: &str) -> RoundOutcome {
        match reason {
            AbandonReason::PeerAbandoned | AbandonReason::Superseded => {
                info!(agent, round, stage, %reason, "round released without result");
            }
            _ => {
                if self.board.abandon_round(round) {
                    warn!(agent, round, stage, %reason, "abandoning consensus round");
                } else if let Gate::Open(next) = self.board.next_gate(round) {
                    // Result landed while giving up: the round is complete.
                    if let Some(&target) = next.get(agent) {
                        info!(
                            agent,
                            round,
                            stage,
                            %reason,
                            "round published before it could be abandoned"
                        );
                        return RoundOutcome::Completed { target, record: None };
                    }
                }
            }
        }
        RoundOutcome::Abandoned { reason }
    }

    /// Poll `gate` until it opens, closes, times out, or `cancel` fires.
    async fn wait<T>(
        &self,
        cancel: &CancellationToken,
        mut gate: impl FnMut() -> Gate<T>,
    ) -> Result<T, AbandonReason> {
        let deadline = Instant::now() + self.settings.timeout;
        loop {
            // Sampled before the gate so an expired wait always gets one last look.
            let expired = Instant::now() >= deadline;
            match gate() {
                Gate::Open(value) => return Ok(value),
                Gate::Closed(reason) => return Err(reason),
                Gate::Pending => {}
            }
            if cancel.is_cancelled() {
                return Err(AbandonReason::Cancelled);
            }
            if expired {
                return Err(AbandonReason::Timeout);
            }
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::PathGraphAveraging;
    use crate::coordination::SentinelPolicy;

    fn protocol(n: usize, timeout_ms: u64) -> ConsensusProtocol {
        ConsensusProtocol::new(
            Arc::new(SharedStateBoard::new(n, SentinelPolicy::ZeroIsUnset)),
            Arc::new(PathGraphAveraging),
            0,
            BarrierSettings {
                timeout: Duration::from_millis(timeout_ms),
                poll_interval: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn two_agents_complete_a_round() {
        let p = protocol(2, 1_000);
        let cancel = CancellationToken::new();
        let (a, b) = tokio::join!(
            p.participate(0, 1, 0.4, &cancel),
            p.participate(1, 1, 1.0, &cancel)
        );

        match a.unwrap() {
            RoundOutcome::Completed { target, record } => {
                assert!((target - 0.7).abs() < 1e-12);
                let record = record.expect("computer records the round");
                assert_eq!(record.inputs, vec![0.4, 1.0]);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        match b.unwrap() {
            RoundOutcome::Completed { target, record } => {
                assert!((target - 0.7).abs() < 1e-12);
                assert!(record.is_none());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn missing_peer_times_out_and_abandons() {
        let p = protocol(2, 200);
        let cancel = CancellationToken::new();
        let outcome = p.participate(0, 1, 0.4, &cancel).await.unwrap();
        assert_eq!(
            outcome,
            RoundOutcome::Abandoned {
                reason: AbandonReason::Timeout
            }
        );
        assert!(p.board().is_abandoned(1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_abandons_round() {
        let p = protocol(3, 10_000);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = p.participate(1, 1, 0.4, &cancel).await.unwrap();
        assert_eq!(
            outcome,
            RoundOutcome::Abandoned {
                reason: AbandonReason::Cancelled
            }
        );
        assert!(p.board().is_abandoned(1));
    }

    #[test]
    fn late_result_completes_instead_of_abandoning() {
        let p = protocol(2, 200);
        let board = Arc::clone(p.board());

        // Agent 0 computes at the last moment; agent 1's abandon must not
        // wipe a result that is already on the board.
        board.arrive(0, 1, 0.4).unwrap();
        board.arrive(1, 1, 0.6).unwrap();
        board.publish_next_vector(&[0.5, 0.5], 1).unwrap();

        let outcome = p.abandon(1, 1, AbandonReason::Timeout, "A");
        assert_eq!(
            outcome,
            RoundOutcome::Completed {
                target: 0.5,
                record: None
            }
        );
        assert!(!board.is_abandoned(1));
        assert_eq!(board.next_gate(1), Gate::Open(vec![0.5, 0.5]));
    }

    #[tokio::test(start_paused = true)]
    async fn bad_index_is_a_board_error() {
        let p = protocol(2, 100);
        let cancel = CancellationToken::new();
        assert!(p.participate(7, 1, 0.4, &cancel).await.is_err());
    }
}
