use crate::stat::Stats;

/// Failure modes of a solve attempt.
///
/// Mirrors the exception hierarchy of the original solver
/// (`unsolvable_e`, `timeout_e`, `maximum_makespan_e`) as a sum type instead
/// of control-flow-by-exception.
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("instance is unsolvable")]
    Unsolvable,

    #[error("solver timed out after {timeout_s}s")]
    Timeout { stats: Box<Stats>, timeout_s: u64 },

    #[error("makespan exceeded the configured maximum of {max_makespan}")]
    MakespanExceeded {
        stats: Box<Stats>,
        max_makespan: usize,
    },

    #[error("formula size exceeded the configured maximum of {max_literals} literals")]
    FormulaTooLarge {
        stats: Box<Stats>,
        max_literals: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SolveError {
    /// The partial `Stats` carried by the "ran out of budget" variants, if any.
    pub fn partial_stats(&self) -> Option<&Stats> {
        match self {
            SolveError::Timeout { stats, .. }
            | SolveError::MakespanExceeded { stats, .. }
            | SolveError::FormulaTooLarge { stats, .. } => Some(stats),
            SolveError::Unsolvable | SolveError::InvalidConfig(_) => None,
        }
    }
}
