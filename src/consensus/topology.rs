//! Fixed neighbour patterns between agents.

use super::ConsensusError;

/// Neighbour lists per node. Node `i`'s value is mixed only with the nodes
/// listed in `neighbours(i)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    neighbours: Vec<Vec<usize>>,
}

impl Topology {
    /// Path graph `0 - 1 - ... - n-1`.
    ///
    /// For `n == 2` this is also the complete graph.
    pub fn path(n: usize) -> Self {
        let neighbours = (0..n)
            .map(|i| {
                let mut adj = Vec::with_capacity(2);
                if i > 0 {
                    adj.push(i - 1);
                }
                if i + 1 < n {
                    adj.push(i + 1);
                }
                adj
            })
            .collect();
        Self { neighbours }
    }

    pub fn len(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbours.is_empty()
    }

    pub fn neighbours(&self, node: usize) -> &[usize] {
        self.neighbours.get(node).map_or(&[], Vec::as_slice)
    }

    /// Apply one averaging step: `out[i] = mean(x[i], x[j] for j in neighbours(i))`.
    pub fn average(&self, values: &[f64]) -> Result<Vec<f64>, ConsensusError> {
        if values.is_empty() {
            return Err(ConsensusError::Empty);
        }
        if values.len() != self.len() {
            return Err(ConsensusError::LengthMismatch {
                expected: self.len(),
                got: values.len(),
            });
        }
        if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ConsensusError::NonFinite { index, value });
        }

        let out = self
            .neighbours
            .iter()
            .enumerate()
            .map(|(i, adj)| {
                let sum: f64 = values[i] + adj.iter().map(|&j| values[j]).sum::<f64>();
                sum / (adj.len() + 1) as f64
            })
            .collect();
        Ok(out)
    }
}
