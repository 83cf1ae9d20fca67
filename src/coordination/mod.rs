//! Synchronization Core
//!
//! ## Round Protocol
//!
//! ```text
//! every agent:   arrive(i, r, reading)            publish current[i], stamp round r
//!                Barrier A: all current[] set AND every agent arrived for r
//! computer only: reset_next(); consensus(current[]); publish_next_vector(out, r)
//!                Barrier B: all next[] set AND next[] stamped with r
//! every agent:   hold next[i]
//! ```
//!
//! Agents communicate only through the [`SharedStateBoard`]. Barriers poll the
//! board cooperatively and give up after a bounded timeout, abandoning the
//! round so no peer is left waiting on it.

mod barrier;
mod board;
mod schedule;

pub use barrier::{BarrierSettings, ConsensusProtocol, RoundOutcome};
pub use board::{AbandonReason, BoardError, BoardSnapshot, Gate, SentinelPolicy, SharedStateBoard};
pub use schedule::{Tick, TickKind, TickScheduler};
