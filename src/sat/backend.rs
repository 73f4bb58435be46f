//! The only module that speaks to the CDCL solver crate directly. Everything
//! above this layer (the registry and the encoder) works in terms of plain
//! `u32` variable indices and signed-literal semantics, so the rest of the
//! SAT pipeline is backend-agnostic and unit-testable without a solver.

use std::time::Duration;

use rustsat::solvers::{Solve, SolveIncremental, SolverResult};
use rustsat::types::{Lit as RsLit, TernaryVal, Var as RsVar};
use rustsat_glucose::core::Glucose;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatOutcome {
    Sat,
    Unsat,
    /// The backend did not return an answer within the remaining budget.
    Unknown,
}

/// A signed backend literal: positive `id` means the variable, negative its
/// negation. `id` is the dense index handed out by `VariableRegistry`.
pub type RawLit = i64;

pub struct SatBackend {
    solver: Glucose,
    n_vars: u32,
}

impl SatBackend {
    pub fn new(n_threads: u32) -> Self {
        let mut solver = Glucose::default();
        let _ = solver.set_n_threads(n_threads.max(1) as usize);
        SatBackend { solver, n_vars: 0 }
    }

    /// Grows the backend's variable pool up to `n`, mirroring
    /// `Solver.hpp::to_cms`'s `solver.new_vars(...)` call.
    pub fn ensure_vars(&mut self, n: u32) {
        if n > self.n_vars {
            self.n_vars = n;
        }
    }

    fn to_rs_lit(raw: RawLit) -> RsLit {
        let idx = (raw.unsigned_abs() - 1) as u32;
        let var = RsVar::new(idx);
        if raw > 0 {
            var.pos_lit()
        } else {
            var.neg_lit()
        }
    }

    pub fn add_clause(&mut self, clause: &[RawLit]) {
        let lits: Vec<RsLit> = clause.iter().map(|&l| Self::to_rs_lit(l)).collect();
        self.solver
            .add_clause(lits.into_iter().collect())
            .expect("adding a clause should not fail outside of UNSAT-core tracking");
    }

    /// Solves under the given assumption literals, respecting `timeout` on a
    /// best-effort basis: if the budget is already exhausted we return
    /// `Unknown` without invoking the backend at all. The embedded Glucose
    /// solver has no portable interrupt hook, so a solve already in flight
    /// will run to completion rather than being preempted mid-search.
    pub fn solve_with_assumptions(&mut self, assumptions: &[RawLit], timeout: Duration) -> SatOutcome {
        if timeout.is_zero() {
            return SatOutcome::Unknown;
        }
        let lits: Vec<RsLit> = assumptions.iter().map(|&l| Self::to_rs_lit(l)).collect();
        match self.solver.solve_assumps(lits) {
            Ok(SolverResult::Sat) => SatOutcome::Sat,
            Ok(SolverResult::Unsat) => SatOutcome::Unsat,
            Ok(SolverResult::Interrupted) => SatOutcome::Unknown,
            Err(_) => SatOutcome::Unknown,
        }
    }

    pub fn value(&self, id: u32) -> Option<bool> {
        let lit = RsVar::new(id).pos_lit();
        match self.solver.lit_val(lit) {
            Ok(TernaryVal::True) => Some(true),
            Ok(TernaryVal::False) => Some(false),
            _ => None,
        }
    }
}
