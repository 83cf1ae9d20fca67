//! Path-graph averaging rule.

use super::{ConsensusError, ConsensusRule, Topology};

/// Path-graph averaging, sized by the input vector.
///
/// Endpoints average with their single neighbour (weight 1/2 each); interior
/// nodes average with both neighbours (weight 1/3 each).
#[derive(Debug, Clone, Copy, Default)]
pub struct PathGraphAveraging;

impl ConsensusRule for PathGraphAveraging {
    fn apply(&self, current: &[f64]) -> Result<Vec<f64>, ConsensusError> {
        consensus(current)
    }

    fn name(&self) -> &str {
        "path-graph averaging"
    }
}

/// Compute the next consensus vector from the current one.
///
/// Pure function: no side effects, no hidden state.
pub fn consensus(current: &[f64]) -> Result<Vec<f64>, ConsensusError> {
    if current.is_empty() {
        return Err(ConsensusError::Empty);
    }
    Topology::path(current.len()).average(current)
}
