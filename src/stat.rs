use std::fs::OpenOptions;
use std::io::Write;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::Config;

/// Solver statistics, gathered the way `Problem.hpp::Stats` and the base
/// repository's `Stats` both do: timings plus formula/bound bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub t_bound_ms: u64,
    pub t_extend_ms: u64,
    pub t_solver_ms: u64,
    pub t_total_ms: u64,

    pub n_clauses: usize,
    pub n_variables: usize,
    pub n_literals: usize,

    pub initial_bound: usize,
    pub lower_bound: usize,
    pub upper_bound: Option<usize>,

    pub low_level_expand_nodes: usize,
    pub high_level_expand_nodes: usize,
}

impl Stats {
    pub const FIELDS: &'static [&'static str] = &[
        "t_bound_ms",
        "t_extend_ms",
        "t_solver_ms",
        "t_total_ms",
        "n_clauses",
        "n_variables",
        "n_literals",
        "initial_bound",
        "lower_bound",
        "upper_bound",
        "low_level_expand_nodes",
        "high_level_expand_nodes",
    ];

    fn csv_row(&self) -> String {
        [
            self.t_bound_ms.to_string(),
            self.t_extend_ms.to_string(),
            self.t_solver_ms.to_string(),
            self.t_total_ms.to_string(),
            self.n_clauses.to_string(),
            self.n_variables.to_string(),
            self.n_literals.to_string(),
            self.initial_bound.to_string(),
            self.lower_bound.to_string(),
            self.upper_bound.map(|v| v.to_string()).unwrap_or_default(),
            self.low_level_expand_nodes.to_string(),
            self.high_level_expand_nodes.to_string(),
        ]
        .join(",")
    }

    /// Appends one CSV row to `config.output_path`, matching the base
    /// repository's `Stats::print` append-mode file write.
    pub fn print(&self, config: &Config) {
        let Some(path) = &config.output_path else {
            tracing::debug!("no output_path configured, skipping stats write");
            return;
        };
        let write_header = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(path);
        let mut file = match file {
            Ok(f) => f,
            Err(e) => {
                error!("failed to open stats file {:?}: {}", path, e);
                return;
            }
        };
        if write_header {
            if let Err(e) = writeln!(file, "{}", Self::FIELDS.join(",")) {
                error!("failed to write stats header: {}", e);
                return;
            }
        }
        if let Err(e) = writeln!(file, "{}", self.csv_row()) {
            error!("failed to write stats row: {}", e);
        }
    }

    pub fn add_bound(&mut self, d: Duration) {
        self.t_bound_ms += d.as_millis() as u64;
    }

    pub fn add_extend(&mut self, d: Duration) {
        self.t_extend_ms += d.as_millis() as u64;
    }

    pub fn add_solver(&mut self, d: Duration) {
        self.t_solver_ms += d.as_millis() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_row_has_one_field_per_header() {
        let s = Stats::default();
        assert_eq!(s.csv_row().split(',').count(), Stats::FIELDS.len());
    }
}
