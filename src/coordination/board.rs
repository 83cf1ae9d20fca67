//! Shared state board: per-agent `current[]` readings and `next[]` targets.
//!
//! One instance is shared by every agent loop for the whole mission. Slot `i`
//! of `current[]` is written only by agent `i`; `next[]` is written only by the
//! designated computer. The board does not enforce who writes what; the round
//! protocol in [`super::ConsensusProtocol`] does.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("Agent index {index} out of range for board of {len} slots")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Vector of {got} values does not match board size {expected}")]
    LengthMismatch { expected: usize, got: usize },
}

// ============================================================================
// Sentinel Policy
// ============================================================================

/// How a slot distinguishes "unset" from a genuine value.
///
/// With `ZeroIsUnset` a published `0.0` is indistinguishable from an empty
/// slot: a vehicle reporting exactly zero altitude (sitting on the ground)
/// holds Barrier A closed until its reading changes. `Explicit` treats every
/// published value as set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelPolicy {
    #[default]
    ZeroIsUnset,
    Explicit,
}

impl SentinelPolicy {
    #[allow(clippy::float_cmp)]
    fn admit(self, value: f64) -> Option<f64> {
        match self {
            SentinelPolicy::ZeroIsUnset if value == 0.0 => None,
            _ => Some(value),
        }
    }
}

// ============================================================================
// Round Gates
// ============================================================================

/// Why a consensus round was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonReason {
    /// A barrier did not open within the configured timeout
    Timeout,
    /// Mission cancellation arrived while waiting
    Cancelled,
    /// The consensus rule rejected the input vector
    Rejected,
    /// Another agent abandoned this round
    PeerAbandoned,
    /// A later round was already published
    Superseded,
}

impl std::fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbandonReason::Timeout => write!(f, "barrier timeout"),
            AbandonReason::Cancelled => write!(f, "cancelled"),
            AbandonReason::Rejected => write!(f, "consensus input rejected"),
            AbandonReason::PeerAbandoned => write!(f, "abandoned by peer"),
            AbandonReason::Superseded => write!(f, "superseded by later round"),
        }
    }
}

/// State of a barrier for one round.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate<T> {
    Open(T),
    Closed(AbandonReason),
    Pending,
}

// ============================================================================
// Board
// ============================================================================

#[derive(Debug)]
struct BoardInner {
    current: Vec<Option<f64>>,
    /// Highest round each agent has arrived at
    arrivals: Vec<u64>,
    next: Vec<Option<f64>>,
    /// Round whose result `next[]` currently holds
    next_round: Option<u64>,
    latest_published: u64,
    abandoned: BTreeSet<u64>,
    rounds_published: u64,
}

/// Serializable view of the board for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub current: Vec<Option<f64>>,
    pub arrivals: Vec<u64>,
    pub next: Vec<Option<f64>>,
    pub next_round: Option<u64>,
    pub latest_published: u64,
    pub abandoned: Vec<u64>,
    pub rounds_published: u64,
}

/// Fixed-size, index-addressed shared storage for the consensus round protocol.
#[derive(Debug)]
pub struct SharedStateBoard {
    inner: Mutex<BoardInner>,
    policy: SentinelPolicy,
    len: usize,
}

impl SharedStateBoard {
    pub fn new(len: usize, policy: SentinelPolicy) -> Self {
        Self {
            inner: Mutex::new(BoardInner {
                current: vec![None; len],
                arrivals: vec![0; len],
                next: vec![None; len],
                next_round: None,
                latest_published: 0,
                abandoned: BTreeSet::new(),
                rounds_published: 0,
            }),
            policy,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn policy(&self) -> SentinelPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, BoardInner> {
        self.inner.lock().unwrap_or_else(|e| {
            tracing::warn!("Board mutex poisoned, recovering");
            e.into_inner()
        })
    }

    fn check_index(&self, index: usize) -> Result<(), BoardError> {
        if index < self.len {
            Ok(())
        } else {
            Err(BoardError::IndexOutOfRange {
                index,
                len: self.len,
            })
        }
    }

    // ------------------------------------------------------------------------
    // current[]
    // ------------------------------------------------------------------------

    /// Overwrite `current[index]` with the latest reading.
    pub fn publish_current(&self, index: usize, value: f64) -> Result<(), BoardError> {
        self.check_index(index)?;
        let slot = self.policy.admit(value);
        self.lock().current[index] = slot;
        Ok(())
    }

    /// Publish `current[index]` and record that the agent reached `round`.
    pub fn arrive(&self, index: usize, round: u64, value: f64) -> Result<(), BoardError> {
        self.check_index(index)?;
        let slot = self.policy.admit(value);
        let mut inner = self.lock();
        inner.current[index] = slot;
        if inner.arrivals[index] < round {
            inner.arrivals[index] = round;
        }
        Ok(())
    }

    /// Snapshot of `current[]`. May mix readings from different sensor ticks.
    pub fn read_current_vector(&self) -> Vec<Option<f64>> {
        self.lock().current.clone()
    }

    /// Barrier A state for `round`: opens with the full `current[]` vector once
    /// every slot is set and every agent has arrived.
    pub fn current_gate(&self, round: u64) -> Gate<Vec<f64>> {
        let inner = self.lock();
        if inner.abandoned.contains(&round) {
            return Gate::Closed(AbandonReason::PeerAbandoned);
        }
        if inner.arrivals.iter().any(|&r| r < round) {
            return Gate::Pending;
        }
        match inner.current.iter().copied().collect::<Option<Vec<f64>>>() {
            Some(values) => Gate::Open(values),
            None => Gate::Pending,
        }
    }

    // ------------------------------------------------------------------------
    // next[]
    // ------------------------------------------------------------------------

    /// Clear every `next[]` slot to the unset sentinel.
    pub fn reset_next(&self) {
        let mut inner = self.lock();
        inner.next.iter_mut().for_each(|slot| *slot = None);
        inner.next_round = None;
    }

    /// Overwrite all of `next[]` in one step and stamp it with `round`.
    pub fn publish_next_vector(&self, values: &[f64], round: u64) -> Result<(), BoardError> {
        if values.len() != self.len {
            return Err(BoardError::LengthMismatch {
                expected: self.len,
                got: values.len(),
            });
        }
        let slots: Vec<Option<f64>> = values.iter().map(|&v| self.policy.admit(v)).collect();
        let mut inner = self.lock();
        inner.next = slots;
        inner.next_round = Some(round);
        inner.latest_published = inner.latest_published.max(round);
        inner.rounds_published += 1;
        Ok(())
    }

    pub fn read_next(&self, index: usize) -> Result<Option<f64>, BoardError> {
        self.check_index(index)?;
        Ok(self.lock().next[index])
    }

    /// Barrier B state for `round`: opens with the full `next[]` vector once
    /// every slot is set and the vector answers `round`.
    pub fn next_gate(&self, round: u64) -> Gate<Vec<f64>> {
        let inner = self.lock();
        if inner.next_round == Some(round) {
            if let Some(values) = inner.next.iter().copied().collect::<Option<Vec<f64>>>() {
                return Gate::Open(values);
            }
        }
        if inner.abandoned.contains(&round) {
            Gate::Closed(AbandonReason::PeerAbandoned)
        } else if inner.latest_published > round {
            Gate::Closed(AbandonReason::Superseded)
        } else {
            Gate::Pending
        }
    }

    // ------------------------------------------------------------------------
    // Round lifecycle
    // ------------------------------------------------------------------------

    /// Abandon `round`: peers parked on either barrier for it are released,
    /// and `next[]` is reset unless it already holds a later round's result.
    ///
    /// A round whose complete result is already on the board cannot be
    /// abandoned. Returns `false` in that case and if the round was already
    /// abandoned.
    pub fn abandon_round(&self, round: u64) -> bool {
        let mut inner = self.lock();
        if inner.next_round == Some(round) && inner.next.iter().all(Option::is_some) {
            return false;
        }
        if !inner.abandoned.insert(round) {
            return false;
        }
        let holds_later = matches!(inner.next_round, Some(r) if r > round);
        if !holds_later {
            inner.next.iter_mut().for_each(|slot| *slot = None);
            inner.next_round = None;
        }
        true
    }

    pub fn is_abandoned(&self, round: u64) -> bool {
        self.lock().abandoned.contains(&round)
    }

    pub fn rounds_published(&self) -> u64 {
        self.lock().rounds_published
    }

    pub fn rounds_abandoned(&self) -> usize {
        self.lock().abandoned.len()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let inner = self.lock();
        BoardSnapshot {
            current: inner.current.clone(),
            arrivals: inner.arrivals.clone(),
            next: inner.next.clone(),
            next_round: inner.next_round,
            latest_published: inner.latest_published,
            abandoned: inner.abandoned.iter().copied().collect(),
            rounds_published: inner.rounds_published,
        }
    }
}
