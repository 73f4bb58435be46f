use std::collections::HashSet;

use crate::config::{AmoEncoding, Config};
use crate::error::SolveError;
use crate::problem::Problem;
use crate::stat::Stats;

use super::backend::{RawLit, SatBackend};
use super::variable::{Lit, Var, VariableRegistry};

/// Builds and incrementally extends the CNF encoding of one MAPD instance,
/// one horizon layer at a time. Method names and clause structure mirror
/// `Solver.hpp`'s private encoding methods directly.
pub struct Encoder<'p> {
    problem: &'p Problem,
    dist: Vec<Vec<Option<usize>>>,

    prep: bool,
    amo_sequential: bool,
    edge_vars_enabled: bool,
    move_vars_enabled: bool,
    fixed_agent_enabled: bool,
    fixed_container_enabled: bool,
    edge_reservation_enabled: bool,
    transport_enabled: bool,
    max_literals: usize,

    registry: VariableRegistry,
    next_aux: u32,
    /// The highest horizon layer fully built so far, or `-1` if none yet
    /// (mirrors `Solver::T`).
    t_built: i64,

    backend: SatBackend,
}

impl<'p> Encoder<'p> {
    pub fn new(problem: &'p Problem, dist: Vec<Vec<Option<usize>>>, config: &Config) -> Self {
        Encoder {
            problem,
            dist,
            prep: config.prep,
            amo_sequential: matches!(config.amo_encoding, AmoEncoding::Sequential),
            edge_vars_enabled: config.edge_vars,
            move_vars_enabled: config.move_vars,
            fixed_agent_enabled: config.fixed_agent,
            fixed_container_enabled: config.fixed_container,
            edge_reservation_enabled: config.edge_reservation,
            transport_enabled: config.transport,
            max_literals: config.max_literals,
            registry: VariableRegistry::new(),
            next_aux: 0,
            t_built: -1,
            backend: SatBackend::new(config.n_threads),
        }
    }

    pub fn t_built(&self) -> i64 {
        self.t_built
    }

    pub fn n_variables(&self) -> usize {
        self.registry.len()
    }

    fn lit_to_raw(&mut self, lit: Lit) -> RawLit {
        let id = self.registry.intern(lit.var);
        self.backend.ensure_vars(id + 1);
        let raw = id as i64 + 1;
        if lit.positive {
            raw
        } else {
            -raw
        }
    }

    fn add(&mut self, lits: &[Lit], stats: &mut Stats) -> Result<(), SolveError> {
        stats.n_clauses += 1;
        stats.n_literals += lits.len();
        if stats.n_literals > self.max_literals {
            return Err(SolveError::FormulaTooLarge {
                stats: Box::new(stats.clone()),
                max_literals: self.max_literals,
            });
        }
        let raw: Vec<RawLit> = lits.iter().map(|&l| self.lit_to_raw(l)).collect();
        self.backend.add_clause(&raw);
        stats.n_variables = self.registry.len();
        Ok(())
    }

    /// Assumption literals pinning every container to its goal at time `t`,
    /// mirroring `Solver.hpp::destination`.
    pub fn destination(&mut self, t: usize) -> Vec<RawLit> {
        self.problem
            .containers()
            .map(|c| {
                let lit = Lit::pos(Var::Vertex {
                    e: c,
                    v: self.problem.goal[c],
                    t,
                });
                self.lit_to_raw(lit)
            })
            .collect()
    }

    pub fn solve_with_assumptions(
        &mut self,
        assumptions: &[RawLit],
        timeout: std::time::Duration,
    ) -> super::backend::SatOutcome {
        self.backend.solve_with_assumptions(assumptions, timeout)
    }

    // ---- AMO encodings (Solver.hpp::amo_binomial / amo_sequential / amo) ----

    fn amo_binomial(&mut self, vars: &[Lit], stats: &mut Stats) -> Result<(), SolveError> {
        for i in 0..vars.len() {
            for j in 0..vars.len() {
                if i != j {
                    self.add(&[!vars[i], !vars[j]], stats)?;
                }
            }
        }
        Ok(())
    }

    fn amo_sequential(&mut self, vars: &[Lit], stats: &mut Stats) -> Result<(), SolveError> {
        if vars.is_empty() {
            return Ok(());
        }
        let r = self.next_aux;
        let aux_lit = |i: u32| Lit::pos(Var::Auxiliary(r + i));
        for i in 0..vars.len() {
            self.add(&[!vars[i], aux_lit(i as u32)], stats)?;
            if i + 1 < vars.len() {
                self.add(&[!aux_lit(i as u32), aux_lit(i as u32 + 1)], stats)?;
                self.add(&[!vars[i + 1], !aux_lit(i as u32)], stats)?;
            }
        }
        self.next_aux = self.next_aux.max(r + vars.len() as u32);
        Ok(())
    }

    fn amo(&mut self, vars: &[Lit], stats: &mut Stats) -> Result<(), SolveError> {
        if self.amo_sequential {
            self.amo_sequential(vars, stats)
        } else {
            self.amo_binomial(vars, stats)
        }
    }

    // ---- clause groups ----

    fn origin(&mut self, stats: &mut Stats) -> Result<(), SolveError> {
        for e in self.problem.entities() {
            self.add(&[Lit::pos(Var::Vertex { e, v: self.problem.start[e], t: 0 })], stats)?;
        }
        Ok(())
    }

    fn fixed_agent(&mut self, stats: &mut Stats) -> Result<(), SolveError> {
        for c in self.problem.containers() {
            let vars: Vec<Lit> = self
                .problem
                .agents()
                .map(|a| Lit::pos(Var::Assignment { c, a }))
                .collect();
            self.amo(&vars, stats)?;
        }
        Ok(())
    }

    fn fixed_container(&mut self, stats: &mut Stats) -> Result<(), SolveError> {
        for a in self.problem.agents() {
            let vars: Vec<Lit> = self
                .problem
                .containers()
                .map(|c| Lit::pos(Var::Assignment { c, a }))
                .collect();
            self.amo(&vars, stats)?;
        }
        Ok(())
    }

    fn uniqueness(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        for e in self.problem.entities() {
            let vars: Vec<Lit> = (0..self.problem.num_vertices)
                .map(|v| Lit::pos(Var::Vertex { e, v, t }))
                .collect();
            self.amo(&vars, stats)?;
        }
        Ok(())
    }

    fn whereabouts(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        for e in self.problem.entities() {
            for v in 0..self.problem.num_vertices {
                let mut clause = vec![
                    !Lit::pos(Var::Vertex { e, v, t }),
                    Lit::pos(Var::Vertex { e, v, t: t + 1 }),
                ];
                for &w in &self.problem.adj[v] {
                    clause.push(Lit::pos(Var::Vertex { e, v: w, t: t + 1 }));
                }
                self.add(&clause, stats)?;
            }
        }
        Ok(())
    }

    fn vertex_reservation(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        for v in 0..self.problem.num_vertices {
            let agent_vars: Vec<Lit> = self
                .problem
                .agents()
                .map(|a| Lit::pos(Var::Vertex { e: a, v, t }))
                .collect();
            self.amo(&agent_vars, stats)?;
            let container_vars: Vec<Lit> = self
                .problem
                .containers()
                .map(|c| Lit::pos(Var::Vertex { e: c, v, t }))
                .collect();
            self.amo(&container_vars, stats)?;
        }
        Ok(())
    }

    fn edge_var_defs(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        for a in self.problem.agents() {
            for &(from, to) in &self.problem.edges {
                self.add(
                    &[
                        !Lit::pos(Var::Edge { a, from, to, t }),
                        Lit::pos(Var::Vertex { e: a, v: from, t }),
                    ],
                    stats,
                )?;
                self.add(
                    &[
                        !Lit::pos(Var::Edge { a, from, to, t }),
                        Lit::pos(Var::Vertex { e: a, v: to, t: t + 1 }),
                    ],
                    stats,
                )?;
                if self.edge_reservation_enabled {
                    self.add(
                        &[
                            !Lit::pos(Var::Vertex { e: a, v: from, t }),
                            !Lit::pos(Var::Vertex { e: a, v: to, t: t + 1 }),
                            Lit::pos(Var::Edge { a, from, to, t }),
                        ],
                        stats,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// The entity range swap prevention is quantified over: all of `C_u_A`
    /// unless `transport` is enabled, in which case only agents move freely
    /// and containers travel attached to them.
    fn reservation_range(&self) -> std::ops::Range<usize> {
        if self.transport_enabled {
            self.problem.agents()
        } else {
            self.problem.entities()
        }
    }

    fn edge_reservation_direct(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        let range = self.reservation_range();
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        for &(u, v) in &self.problem.edges {
            if seen.contains(&(v, u)) {
                continue;
            }
            seen.insert((u, v));
            for a in range.clone() {
                for b in range.clone() {
                    if a != b {
                        self.add(
                            &[
                                !Lit::pos(Var::Vertex { e: a, v: u, t }),
                                !Lit::pos(Var::Vertex { e: a, v, t: t + 1 }),
                                !Lit::pos(Var::Vertex { e: b, v, t }),
                                !Lit::pos(Var::Vertex { e: b, v: u, t: t + 1 }),
                            ],
                            stats,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn edge_reservation_ev(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        let range = self.reservation_range();
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        for &(u, v) in &self.problem.edges {
            if seen.contains(&(v, u)) {
                continue;
            }
            seen.insert((u, v));
            let mut vars = Vec::new();
            for a in range.clone() {
                vars.push(Lit::pos(Var::Edge { a, from: u, to: v, t }));
                vars.push(Lit::pos(Var::Edge { a, from: v, to: u, t }));
            }
            self.amo(&vars, stats)?;
        }
        Ok(())
    }

    fn edge_reservation(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        if self.edge_vars_enabled {
            self.edge_reservation_ev(t, stats)
        } else {
            self.edge_reservation_direct(t, stats)
        }
    }

    fn transport_direct(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        for c in self.problem.containers() {
            for &(from, to) in &self.problem.edges {
                let base = [
                    !Lit::pos(Var::Vertex { e: c, v: from, t }),
                    !Lit::pos(Var::Vertex { e: c, v: to, t: t + 1 }),
                ];
                let mut transported: Vec<Lit> = base.to_vec();
                for a in self.problem.agents() {
                    transported.push(Lit::pos(Var::Vertex { e: a, v: from, t }));

                    let mut transporting: Vec<Lit> = base.to_vec();
                    transporting.push(!Lit::pos(Var::Vertex { e: a, v: from, t }));

                    if self.fixed_agent_enabled || self.fixed_container_enabled {
                        let mut assigned = transporting.clone();
                        assigned.push(!Lit::pos(Var::Assignment { c, a }));
                        self.add(&assigned, stats)?;
                    }

                    transporting.push(Lit::pos(Var::Vertex { e: a, v: to, t: t + 1 }));
                    self.add(&transporting, stats)?;
                }
                self.add(&transported, stats)?;
            }
        }
        Ok(())
    }

    fn transport_ev(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        for c in self.problem.containers() {
            for &(from, to) in &self.problem.edges {
                let mut clause = vec![
                    !Lit::pos(Var::Vertex { e: c, v: from, t }),
                    !Lit::pos(Var::Vertex { e: c, v: to, t: t + 1 }),
                ];
                for a in self.problem.agents() {
                    clause.push(Lit::pos(Var::Edge { a, from, to, t }));
                }
                self.add(&clause, stats)?;
            }
        }
        Ok(())
    }

    fn transport_mv(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        let mut aux = self.next_aux;
        for &(from, to) in &self.problem.edges {
            let moving = aux;
            let moved = aux + 1;
            aux += 2;
            for c in self.problem.containers() {
                self.add(
                    &[
                        !Lit::pos(Var::Vertex { e: c, v: from, t }),
                        !Lit::pos(Var::Vertex { e: c, v: to, t: t + 1 }),
                        Lit::pos(Var::Auxiliary(moving)),
                    ],
                    stats,
                )?;
            }
            let mut clause = vec![!Lit::pos(Var::Auxiliary(moved))];
            for a in self.problem.agents() {
                clause.push(Lit::pos(Var::Edge { a, from, to, t }));
            }
            self.add(&clause, stats)?;
            self.add(
                &[
                    !Lit::pos(Var::Auxiliary(moving)),
                    Lit::pos(Var::Auxiliary(moved)),
                ],
                stats,
            )?;
        }
        self.next_aux = self.next_aux.max(aux);
        Ok(())
    }

    fn transport(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        if self.edge_vars_enabled {
            if self.move_vars_enabled {
                self.transport_mv(t, stats)
            } else {
                self.transport_ev(t, stats)
            }
        } else {
            self.transport_direct(t, stats)
        }
    }

    fn preprocessed(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        for e in self.problem.entities() {
            for v in 0..self.problem.num_vertices {
                if self.dist[e][v].map(|d| d > t).unwrap_or(true) {
                    self.add(&[!Lit::pos(Var::Vertex { e, v, t })], stats)?;
                }
            }
        }
        Ok(())
    }

    /// Incrementally grows the formula to cover horizon `t`, exactly as
    /// `Solver.hpp::extend`.
    pub fn extend(&mut self, t: usize, stats: &mut Stats) -> Result<(), SolveError> {
        while (t as i64) > self.t_built {
            self.t_built += 1;
            let big_t = self.t_built as usize;
            if self.prep {
                self.preprocessed(big_t, stats)?;
            }
            self.uniqueness(big_t, stats)?;
            self.vertex_reservation(big_t, stats)?;
            if self.t_built > 0 {
                let prev = big_t - 1;
                if self.edge_vars_enabled {
                    self.edge_var_defs(prev, stats)?;
                }
                self.whereabouts(prev, stats)?;
                if self.edge_reservation_enabled {
                    self.edge_reservation(prev, stats)?;
                }
                if self.transport_enabled {
                    self.transport(prev, stats)?;
                }
            }
        }
        Ok(())
    }

    pub fn origin_and_assignment_amos(&mut self, stats: &mut Stats) -> Result<(), SolveError> {
        self.origin(stats)?;
        if self.fixed_agent_enabled {
            self.fixed_agent(stats)?;
        }
        if self.fixed_container_enabled {
            self.fixed_container(stats)?;
        }
        Ok(())
    }

    /// Reconstructs `paths[e][t]` from the satisfying assignment found for
    /// horizon `makespan`, mirroring the model-scanning loop at the end of
    /// `Solver.hpp::solve()`.
    pub fn extract_paths(&self, makespan: usize) -> Vec<Vec<usize>> {
        let mut paths = vec![vec![0usize; makespan + 1]; self.problem.num_entities()];
        for id in 0..self.registry.len() as u32 {
            if self.backend.value(id) != Some(true) {
                continue;
            }
            if let Some(Var::Vertex { e, v, t }) = self.registry.var_at(id) {
                if t <= makespan {
                    paths[e][t] = v;
                }
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn test_config() -> Config {
        let cli = crate::config::Cli::parse_from(["mapd", "--generate", "3,0,1,1,seed"]);
        Config::new(&cli).unwrap()
    }

    fn small_problem() -> Problem {
        Problem::new_grid(3, vec![0, 2], vec![8], vec![])
    }

    #[test]
    fn extend_builds_up_to_requested_horizon() {
        let problem = small_problem();
        let (_, dist) = problem.bound(true).unwrap();
        let config = test_config();
        let mut encoder = Encoder::new(&problem, dist, &config);
        let mut stats = Stats::default();
        encoder.origin_and_assignment_amos(&mut stats).unwrap();
        encoder.extend(3, &mut stats).unwrap();
        assert_eq!(encoder.t_built(), 3);
        assert!(stats.n_clauses > 0);
    }

    #[test]
    fn amo_sequential_reserves_one_aux_per_literal() {
        let problem = small_problem();
        let (_, dist) = problem.bound(true).unwrap();
        let config = test_config();
        let mut encoder = Encoder::new(&problem, dist, &config);
        let mut stats = Stats::default();
        let vars: Vec<Lit> = (0..4)
            .map(|v| Lit::pos(Var::Vertex { e: 0, v, t: 0 }))
            .collect();
        encoder.amo_sequential(&vars, &mut stats).unwrap();
        assert_eq!(encoder.next_aux, 4);
    }
}
