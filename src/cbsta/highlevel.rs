use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::Config;
use crate::error::SolveError;
use crate::matching::NextBestAssignment;
use crate::problem::Problem;
use crate::solution::Solution;
use crate::stat::Stats;

use super::constraints::{Constraints, EdgeConstraint, VertexConstraint};
use super::environment::ShortestPaths;
use super::lowlevel;
use super::state::Task;

#[derive(Debug, Clone, Copy)]
enum ConflictKind {
    Vertex { t: usize, x: usize },
    Edge { t: usize, from: usize, to: usize },
}

#[derive(Debug, Clone, Copy)]
struct Conflict {
    agent_1: usize,
    agent_2: usize,
    kind: ConflictKind,
}

#[derive(Clone)]
struct TaNode {
    /// True only for nodes seeded directly from a task assignment; only
    /// these spawn a sibling from the next-best assignment, per spec
    /// §4.7's characteristic CBS-TA move.
    is_root: bool,
    tasks: Vec<Option<Task>>,
    constraints: Vec<Constraints>,
    /// Local-agent-indexed plans (length `num_agents`), used for conflict
    /// detection and node cost. Container entities don't move on their own
    /// and are reconstructed separately once a final node is chosen.
    agent_paths: Vec<Vec<usize>>,
    cost: usize,
}

impl PartialEq for TaNode {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}
impl Eq for TaNode {}
impl PartialOrd for TaNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for TaNode {
    // Inverted so `BinaryHeap` (a max-heap) pops the lowest cost first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.cmp(&self.cost)
    }
}

fn max_time_bound(problem: &Problem, constraints: &[Constraints]) -> usize {
    let max_constraint = constraints
        .iter()
        .flat_map(|c| c.vertex.iter().map(|v| v.time))
        .chain(constraints.iter().flat_map(|c| c.edge.iter().map(|e| e.time + 1)))
        .max()
        .unwrap_or(0);
    max_constraint + problem.num_vertices + 1
}

fn plan_agent(
    problem: &Problem,
    shortest: &ShortestPaths,
    agent_index: usize,
    task: Option<Task>,
    constraints: &[Constraints],
) -> Option<Vec<usize>> {
    let max_time = max_time_bound(problem, constraints);
    let entity = problem.num_containers + agent_index;
    let plan = lowlevel::search(
        problem,
        shortest,
        entity,
        task,
        &constraints[agent_index],
        max_time,
    )?;
    Some(plan.positions)
}

/// Node cost is the bottleneck (makespan) over agent plans, not their sum:
/// `cbs_mapd.hpp` takes `std::max(...)` over agent costs at every site that
/// derives a node's cost, since spec.md §3 defines
/// `cost = maxᵢ cost(solutionᵢ)`.
fn cost_of(paths: &[Vec<usize>]) -> usize {
    paths.iter().map(|p| p.len().saturating_sub(1)).max().unwrap_or(0)
}

fn position_at(path: &[usize], t: usize) -> usize {
    *path.get(t).unwrap_or_else(|| path.last().unwrap())
}

/// First inter-agent conflict, scanning time ascending then, at each time
/// step, all vertex conflicts before any edge conflict spanning `(t, t+1)`,
/// earliest `(t, i<j)` winning. Mirrors spec §4.7 step 1 /
/// `cbs_mapd.hpp`'s `getFirstConflict`, which checks `vertex(t)` then
/// `edge(t, t+1)` inside one iteration over `t`.
fn first_conflict(paths: &[Vec<usize>]) -> Option<Conflict> {
    let max_len = paths.iter().map(|p| p.len()).max().unwrap_or(0);
    for t in 0..max_len {
        for i in 0..paths.len() {
            for j in (i + 1)..paths.len() {
                if position_at(&paths[i], t) == position_at(&paths[j], t) {
                    return Some(Conflict {
                        agent_1: i,
                        agent_2: j,
                        kind: ConflictKind::Vertex {
                            t,
                            x: position_at(&paths[i], t),
                        },
                    });
                }
            }
        }
        if t + 1 >= max_len {
            continue;
        }
        for i in 0..paths.len() {
            for j in (i + 1)..paths.len() {
                let (i_cur, i_next) = (position_at(&paths[i], t), position_at(&paths[i], t + 1));
                let (j_cur, j_next) = (position_at(&paths[j], t), position_at(&paths[j], t + 1));
                if i_cur == j_next && j_cur == i_next && i_cur != i_next {
                    return Some(Conflict {
                        agent_1: i,
                        agent_2: j,
                        kind: ConflictKind::Edge {
                            t,
                            from: i_cur,
                            to: i_next,
                        },
                    });
                }
            }
        }
    }
    None
}

fn build_node(
    problem: &Problem,
    shortest: &ShortestPaths,
    is_root: bool,
    tasks: Vec<Option<Task>>,
    constraints: Vec<Constraints>,
) -> Option<TaNode> {
    let mut agent_paths = Vec::with_capacity(problem.num_agents);
    for (idx, task) in tasks.iter().enumerate() {
        agent_paths.push(plan_agent(problem, shortest, idx, *task, &constraints)?);
    }
    let cost = cost_of(&agent_paths);
    Some(TaNode {
        is_root,
        tasks,
        constraints,
        agent_paths,
        cost,
    })
}

/// Expands a node's local-agent-indexed plans into the entity-indexed shape
/// `Solution.paths` uses elsewhere (`sat/encoder.rs::extract_paths`):
/// container slots at `0..num_containers`, agent slots at
/// `num_containers..num_entities`. A container's path sits constant at its
/// pickup vertex until the assigned agent first reaches that vertex, then
/// mirrors the carrying agent's path from that timestep on (it rides along,
/// including resting at the goal after delivery). An unassigned container
/// stays at its start vertex for the whole horizon.
fn full_solution_paths(problem: &Problem, tasks: &[Option<Task>], agent_paths: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let max_len = agent_paths.iter().map(|p| p.len()).max().unwrap_or(1).max(1);
    let mut paths = Vec::with_capacity(problem.num_entities());

    for container in problem.containers() {
        let start = problem.start[container];
        let carrier = tasks
            .iter()
            .enumerate()
            .find(|(_, task)| matches!(task, Some(t) if t.container == container));
        let path = if let Some((agent_idx, _)) = carrier {
            let agent_path = &agent_paths[agent_idx];
            let pickup_t = agent_path.iter().position(|&v| v == start).unwrap_or(0);
            (0..max_len)
                .map(|t| {
                    if t < pickup_t {
                        start
                    } else {
                        position_at(agent_path, t)
                    }
                })
                .collect()
        } else {
            vec![start; max_len]
        };
        paths.push(path);
    }

    for agent_path in agent_paths {
        paths.push(agent_path.clone());
    }

    paths
}

fn assignment_to_tasks(problem: &Problem, assignment: &std::collections::HashMap<usize, usize>) -> Vec<Option<Task>> {
    (0..problem.num_agents)
        .map(|local| {
            assignment.get(&local).map(|&container| Task {
                container,
                start: problem.start[container],
                goal: problem.goal[container],
            })
        })
        .collect()
}

/// CBS-TA high-level search: the root is seeded by the cheapest bottleneck
/// task assignment; successive root siblings are drawn lazily from the
/// ranked assignment enumerator whenever a root node is popped conflict-free
/// of further task-assignment alternatives. Mirrors `cbs_mapd.hpp::CBSTA::search`.
pub fn solve(problem: &Problem, config: &Config) -> Result<Solution, SolveError> {
    let start = Instant::now();
    let deadline = Duration::from_secs(config.timeout_secs);
    let shortest = ShortestPaths::build(problem);
    let mut stats = Stats::default();

    let agent_ids: Vec<usize> = (0..problem.num_agents).collect();
    let task_ids: Vec<usize> = problem.containers().collect();
    let mut ranker = NextBestAssignment::new(agent_ids, task_ids);
    for a in 0..problem.num_agents {
        for c in problem.containers() {
            let agent_vertex = problem.start[problem.num_containers + a];
            let cost = shortest
                .get(agent_vertex, problem.start[c])
                .and_then(|to_pickup| shortest.get(problem.start[c], problem.goal[c]).map(|d| to_pickup + d));
            if let Some(cost) = cost {
                ranker.set_cost(a, c, cost as i64);
            }
        }
    }
    ranker.solve();
    let mut task_assignments_drawn = 0usize;

    let mut open: BinaryHeap<TaNode> = BinaryHeap::new();
    if let Some((assignment, _cost)) = ranker.next_solution() {
        task_assignments_drawn += 1;
        let tasks = assignment_to_tasks(problem, &assignment);
        let constraints = vec![Constraints::default(); problem.num_agents];
        if let Some(root) = build_node(problem, &shortest, true, tasks, constraints) {
            open.push(root);
        }
    }

    while let Some(node) = open.pop() {
        if start.elapsed() >= deadline {
            return Err(SolveError::Timeout {
                stats: Box::new(stats),
                timeout_s: config.timeout_secs,
            });
        }
        stats.high_level_expand_nodes += 1;

        let conflict = first_conflict(&node.agent_paths);
        let Some(conflict) = conflict else {
            stats.t_total_ms = start.elapsed().as_millis() as u64;
            let makespan = cost_of(&node.agent_paths);
            let paths = full_solution_paths(problem, &node.tasks, &node.agent_paths);
            return Ok(Solution {
                makespan,
                paths,
                stats,
            });
        };
        debug!(?conflict.agent_1, ?conflict.agent_2, "CBS-TA conflict");

        if node.is_root && task_assignments_drawn < config.max_task_assignments {
            if let Some((assignment, _cost)) = ranker.next_solution() {
                task_assignments_drawn += 1;
                let tasks = assignment_to_tasks(problem, &assignment);
                let constraints = vec![Constraints::default(); problem.num_agents];
                if let Some(sibling) = build_node(problem, &shortest, true, tasks, constraints) {
                    open.push(sibling);
                }
            }
        }

        let (c1, c2) = match conflict.kind {
            ConflictKind::Vertex { t, x } => (
                VertexConstraint { time: t, vertex: x },
                VertexConstraint { time: t, vertex: x },
            ),
            ConflictKind::Edge { t, from, to } => {
                let c1 = EdgeConstraint { time: t, from, to };
                let c2 = EdgeConstraint { time: t, from: to, to: from };
                for (agent, constraint) in [(conflict.agent_1, c1), (conflict.agent_2, c2)] {
                    let mut child_constraints = node.constraints.clone();
                    child_constraints[agent].edge.insert(constraint);
                    if let Some(child) = build_node(
                        problem,
                        &shortest,
                        false,
                        node.tasks.clone(),
                        child_constraints,
                    ) {
                        open.push(child);
                    }
                }
                continue;
            }
        };
        for agent in [conflict.agent_1, conflict.agent_2] {
            let mut child_constraints = node.constraints.clone();
            let c = if agent == conflict.agent_1 { c1 } else { c2 };
            child_constraints[agent].vertex.insert(c);
            if let Some(child) = build_node(problem, &shortest, false, node.tasks.clone(), child_constraints) {
                open.push(child);
            }
        }
    }

    Err(SolveError::Unsolvable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AmoEncoding, Config, SolverKind};

    fn base_config() -> Config {
        Config {
            instance_path: None,
            generate: None,
            output_path: None,
            solution_path: None,
            solver: SolverKind::CbsTa,
            prep: true,
            exp_factor: 2.0,
            amo_encoding: AmoEncoding::Sequential,
            edge_vars: false,
            move_vars: false,
            fixed_agent: false,
            fixed_container: false,
            n_threads: 1,
            max_makespan: 64,
            max_literals: 1_000_000,
            edge_reservation: true,
            transport: true,
            low_level_sub_optimal: Some(1.0),
            high_level_sub_optimal: Some(1.0),
            op_prioritize_conflicts: false,
            op_bypass_conflicts: false,
            op_target_reasoning: false,
            max_task_assignments: 64,
            timeout_secs: 10,
            log: false,
        }
    }

    #[test]
    fn solves_a_single_agent_single_container_instance() {
        let p = Problem::new_grid(3, vec![0, 8], vec![8], vec![]);
        let sol = solve(&p, &base_config()).expect("should find a plan");
        assert_eq!(sol.paths.len(), p.num_entities());
        // Agent (entity index num_containers == 1) ends up at the goal.
        let agent_path = &sol.paths[p.num_containers];
        assert_eq!(agent_path.last(), Some(&8));
        // Container (entity index 0) sits at its start until pickup, then
        // rides along with the agent, and also ends at the goal.
        let container_path = &sol.paths[0];
        assert_eq!(container_path.first(), Some(&0));
        assert_eq!(container_path.last(), Some(&8));
    }

    #[test]
    fn two_agents_avoid_colliding_while_delivering() {
        // 3x3 grid: two containers need opposite corners, two agents
        // already sit near them.
        let p = Problem::new_grid(3, vec![0, 2, 6, 8], vec![8, 0], vec![]);
        let sol = solve(&p, &base_config()).expect("should find a conflict-free plan");
        let agent0 = &sol.paths[p.num_containers];
        let agent1 = &sol.paths[p.num_containers + 1];
        let max_len = agent0.len().max(agent1.len());
        for t in 0..max_len {
            let pos0 = position_at(agent0, t);
            let pos1 = position_at(agent1, t);
            assert_ne!(pos0, pos1, "agents collided at t={t}");
        }
    }
}
