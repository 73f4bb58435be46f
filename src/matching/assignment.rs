use std::collections::{BTreeSet, HashMap, HashSet};

use super::hopcroft_karp::hopcroft_karp;

/// Bottleneck (minimax) bipartite assignment: finds the agent/task matching
/// that minimises the *maximum* edge cost, searching ascending over the
/// distinct cost values. Grounded on
/// `next_best_assignment.hpp::Assignment::solve`/`solveBounded`.
#[derive(Debug, Default, Clone)]
pub struct Assignment {
    costs: HashMap<(usize, usize), i64>,
    agents: BTreeSet<usize>,
    tasks: BTreeSet<usize>,
    prioritized: HashSet<usize>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cost(&mut self, agent: usize, task: usize, cost: i64) {
        self.agents.insert(agent);
        self.tasks.insert(task);
        self.costs.insert((agent, task), cost);
    }

    pub fn prioritize_agent(&mut self, agent: usize) {
        self.prioritized.insert(agent);
    }

    /// Finds the matching of minimum bottleneck cost that is at least
    /// `min_makespan` and respects `seed` (agent -> task pairs that must be
    /// kept, e.g. from a previously fixed high-level CBS-TA node). Returns
    /// the full matching plus its bottleneck cost, or `None` if no perfect
    /// matching over `agents`/`tasks` exists at any cost.
    pub fn solve(
        &self,
        seed: &HashMap<usize, usize>,
        min_makespan: i64,
    ) -> Option<(HashMap<usize, usize>, i64)> {
        let mut distinct_costs: Vec<i64> = self
            .costs
            .values()
            .copied()
            .filter(|&c| c >= min_makespan)
            .collect();
        distinct_costs.sort_unstable();
        distinct_costs.dedup();

        let agents: Vec<usize> = self.agents.iter().copied().collect();
        let tasks: Vec<usize> = self.tasks.iter().copied().collect();
        if agents.is_empty() || tasks.is_empty() {
            return None;
        }

        // Two-phase: first fix prioritized agents to the best matching
        // restricted to them, then extend to every agent using that as a
        // seed. Mirrors `Assignment::solve` calling `solveBounded` for
        // `m_prioAgents` before the full `m_agents` pass.
        for &max_cost in &distinct_costs {
            let prio: Vec<usize> = agents
                .iter()
                .copied()
                .filter(|a| self.prioritized.contains(a))
                .collect();
            let partial = if prio.is_empty() {
                HashMap::new()
            } else {
                match self.solve_bounded(&prio, &tasks, seed, max_cost) {
                    Some(m) if m.len() == prio.len() => m,
                    _ => continue,
                }
            };
            if let Some(full) = self.solve_bounded(&agents, &tasks, &partial, max_cost) {
                if full.len() == agents.len().min(tasks.len()) {
                    return Some((full, max_cost));
                }
            }
        }
        None
    }

    /// One bounded Hopcroft-Karp pass: edges are restricted to cost
    /// `<= max_cost`, and `seed` pairs are preset as already matched before
    /// augmenting. Mirrors `solveBounded`.
    fn solve_bounded(
        &self,
        agents: &[usize],
        tasks: &[usize],
        seed: &HashMap<usize, usize>,
        max_cost: i64,
    ) -> Option<HashMap<usize, usize>> {
        let agent_index: HashMap<usize, usize> =
            agents.iter().enumerate().map(|(i, &a)| (a, i)).collect();
        let task_index: HashMap<usize, usize> =
            tasks.iter().enumerate().map(|(i, &t)| (t, i)).collect();

        let mut adj = vec![Vec::new(); agents.len()];
        for (i, &a) in agents.iter().enumerate() {
            for (j, &t) in tasks.iter().enumerate() {
                if let Some(&c) = self.costs.get(&(a, t)) {
                    if c <= max_cost {
                        adj[i].push(j);
                    }
                }
            }
        }

        let mut match_left: Vec<Option<usize>> = vec![None; agents.len()];
        let mut match_right: Vec<Option<usize>> = vec![None; tasks.len()];
        for (&a, &t) in seed {
            if let (Some(&i), Some(&j)) = (agent_index.get(&a), task_index.get(&t)) {
                if adj[i].contains(&j) {
                    match_left[i] = Some(j);
                    match_right[j] = Some(i);
                }
            }
        }

        hopcroft_karp(agents.len(), &adj, &mut match_left, &mut match_right);

        let mut result = HashMap::new();
        for (i, &a) in agents.iter().enumerate() {
            if let Some(j) = match_left[i] {
                result.insert(a, tasks[j]);
            }
        }
        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_minimum_bottleneck_matching() {
        let mut a = Assignment::new();
        // agent 0 to task 0 costs 5, agent 0 to task 1 costs 1
        // agent 1 to task 0 costs 1, agent 1 to task 1 costs 5
        a.set_cost(0, 0, 5);
        a.set_cost(0, 1, 1);
        a.set_cost(1, 0, 1);
        a.set_cost(1, 1, 5);
        let (matching, cost) = a.solve(&HashMap::new(), 0).unwrap();
        assert_eq!(cost, 1);
        assert_eq!(matching.len(), 2);
    }

    #[test]
    fn no_matching_when_infeasible() {
        let mut a = Assignment::new();
        a.set_cost(0, 0, 1);
        // agent 1 and task 1 exist but have no connecting edge, so the
        // 2x2 bipartite graph can never reach a full matching.
        a.agents.insert(1);
        a.tasks.insert(1);
        assert!(a.solve(&HashMap::new(), 0).is_none());
    }

    #[test]
    fn prioritized_agent_keeps_its_best_task() {
        let mut a = Assignment::new();
        a.set_cost(0, 0, 1);
        a.set_cost(0, 1, 1);
        a.set_cost(1, 0, 1);
        a.set_cost(1, 1, 1);
        a.prioritize_agent(0);
        let (matching, _) = a.solve(&HashMap::new(), 0).unwrap();
        assert_eq!(matching.len(), 2);
    }
}
