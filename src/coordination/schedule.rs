//! Integer tick schedule derived from sample timestamps.
//!
//! Ticks are counted in whole time units since the agent's own `t0`. A tick
//! fires on the first sample observed at or beyond its boundary; later samples
//! inside the same time unit never fire it again.

/// What a fired tick asks the agent to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// Re-command the current target for one hold period
    Hold,
    /// Take part in consensus round `round` (1-based)
    Consensus { round: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Whole time units since `t0`
    pub index: u64,
    pub kind: TickKind,
}

/// Per-agent tick counter. Not shared between agents.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    time_unit_ms: u64,
    consensus_period: u64,
    last_tick: u64,
    last_round: u64,
}

impl TickScheduler {
    /// `time_unit_ms` and `consensus_period` are clamped to at least 1.
    pub fn new(time_unit_ms: u64, consensus_period: u64) -> Self {
        Self {
            time_unit_ms: time_unit_ms.max(1),
            consensus_period: consensus_period.max(1),
            last_tick: 0,
            last_round: 0,
        }
    }

    /// Feed the elapsed time of the next sample. Returns the tick it fires,
    /// if any.
    ///
    /// If a sample jumps over several boundaries only the latest tick fires;
    /// it is a consensus tick when any consensus boundary was crossed, and
    /// carries the newest round number.
    pub fn observe(&mut self, elapsed_ms: u64) -> Option<Tick> {
        let index = elapsed_ms / self.time_unit_ms;
        if index <= self.last_tick {
            return None;
        }
        self.last_tick = index;

        let round = index / self.consensus_period;
        let kind = if round > self.last_round {
            self.last_round = round;
            TickKind::Consensus { round }
        } else {
            TickKind::Hold
        };
        Some(Tick { index, kind })
    }

    /// True while no consensus boundary has been reached yet.
    pub fn before_first_round(&self, tick: &Tick) -> bool {
        tick.index < self.consensus_period
    }

    pub fn last_round(&self) -> u64 {
        self.last_round
    }
}
