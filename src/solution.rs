use serde::{Deserialize, Serialize};

use crate::stat::Stats;

/// A found plan, shared between the SAT solver and CBS-TA: `paths[e][t]` is
/// the vertex entity `e` occupies at time `t`, for `t` in `0..=makespan`.
/// Mirrors `Problem.hpp::Solution` without the inheritance-from-`Problem`
/// the original uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub makespan: usize,
    pub paths: Vec<Vec<usize>>,
    pub stats: Stats,
}

impl Solution {
    /// Vertex entity `e` occupies at time `t`, clamped to the makespan
    /// (entities stay at their final vertex after completing their plan).
    pub fn position_at(&self, e: usize, t: usize) -> usize {
        let t = t.min(self.makespan);
        self.paths[e][t]
    }
}
