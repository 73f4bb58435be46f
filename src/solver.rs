//! Top-level solver dispatch, mirroring the base repository's `src/solver.rs`
//! `Solver` trait by picking a concrete backend from `Config::solver`.

use crate::cbsta;
use crate::config::{Config, SolverKind};
use crate::error::SolveError;
use crate::problem::Problem;
use crate::sat;
use crate::solution::Solution;

pub fn solve(problem: &Problem, config: &Config) -> Result<Solution, SolveError> {
    match config.solver {
        SolverKind::Sat => sat::driver::solve(problem, config),
        SolverKind::CbsTa => cbsta::highlevel::solve(problem, config),
    }
}
