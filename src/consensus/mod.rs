//! Consensus Engine
//!
//! Pure neighbour-averaging rule that maps the board's `current[]` vector to
//! the next consensus target for every agent. This is the only place the
//! consensus math lives; the barrier protocol calls it through the
//! [`ConsensusRule`] trait so tests can observe or replace it.
//!
//! ## Rule
//!
//! Agents form a path graph `0 - 1 - ... - N-1`. Each node's next value is the
//! mean of itself and its graph neighbours:
//!
//! ```text
//! N = 2:  out = [ (x0+x1)/2, (x0+x1)/2 ]
//! N = 3:  out = [ (x0+x1)/2, (x0+x1+x2)/3, (x1+x2)/2 ]
//! N = 5:  out = [ (x0+x1)/2, (x0+x1+x2)/3, (x1+x2+x3)/3, (x2+x3+x4)/3, (x3+x4)/2 ]
//! ```
//!
//! The same form is applied to any other length.

mod engine;
mod topology;

pub use engine::{consensus, PathGraphAveraging};
pub use topology::Topology;

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// The consensus input was rejected; the round must not be published.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConsensusError {
    #[error("Consensus input is empty")]
    Empty,

    #[error("Consensus input {index} is not finite: {value}")]
    NonFinite { index: usize, value: f64 },

    #[error("Consensus input has {got} values, topology expects {expected}")]
    LengthMismatch { expected: usize, got: usize },
}

// ============================================================================
// Rule Trait
// ============================================================================

/// A consensus rule invoked once per round by the designated computer.
///
/// Implementations must be pure: the same input always yields the same
/// output, and the output has the same length as the input.
pub trait ConsensusRule: Send + Sync + 'static {
    fn apply(&self, current: &[f64]) -> Result<Vec<f64>, ConsensusError>;

    /// Name for logging.
    fn name(&self) -> &str;
}
