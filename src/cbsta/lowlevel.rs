use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::rc::Rc;

use crate::problem::Problem;

use super::constraints::Constraints;
use super::environment::ShortestPaths;
use super::state::{initial_status, next_status, State, Status, Task};

/// One time-expanded A* search over `(time, vertex, status)`, grounded on
/// `a_star.hpp::AStar::search` and `cbs_mapd.cpp::Environment`'s
/// `getNeighbors`/`admissibleHeuristic`/`isSolution`, generalised the way
/// the base repository's `common/lowlevel.rs` wraps open-list nodes.
pub struct LowLevelPlan {
    pub positions: Vec<usize>,
    pub cost: usize,
}

struct NodeData {
    state: State,
    g: usize,
    parent: Option<Rc<NodeData>>,
}

struct HeapEntry {
    f: usize,
    g: usize,
    node: Rc<NodeData>,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.g == other.g
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    // Lower f wins; ties broken toward higher g, matching the base
    // repository's `OpenOrderWrapper` tie-break.
    fn cmp(&self, other: &Self) -> Ordering {
        other.f.cmp(&self.f).then(self.g.cmp(&other.g))
    }
}

fn heuristic(shortest: &ShortestPaths, vertex: usize, status: Status, task: Option<&Task>) -> Option<usize> {
    match (status, task) {
        (Status::Done, _) | (_, None) => Some(0),
        (Status::Delivery, Some(t)) => shortest.get(vertex, t.goal),
        (Status::Approach, Some(t)) => {
            let to_start = shortest.get(vertex, t.start)?;
            let to_goal = shortest.get(t.start, t.goal)?;
            Some(to_start + to_goal)
        }
    }
}

fn is_solution(state: State, task: Option<&Task>, last_goal_constraint: Option<usize>) -> bool {
    if task.is_none() {
        return true;
    }
    if next_status(state.vertex, state.status, task) != Status::Done {
        return false;
    }
    match last_goal_constraint {
        Some(t) => state.time > t,
        None => true,
    }
}

fn reconstruct(node: &Rc<NodeData>) -> Vec<usize> {
    let mut rev = Vec::new();
    let mut cur = Some(node.clone());
    while let Some(n) = cur {
        rev.push(n.state.vertex);
        cur = n.parent.clone();
    }
    rev.reverse();
    rev
}

/// Finds a minimum-cost time-expanded path for the entity at index
/// `entity` (its start vertex is `problem.start[entity]`), performing
/// `task` (or none) along the way, subject to `constraints`. Returns `None`
/// if no plan exists within `max_time` steps.
pub fn search(
    problem: &Problem,
    shortest: &ShortestPaths,
    entity: usize,
    task: Option<Task>,
    constraints: &Constraints,
    max_time: usize,
) -> Option<LowLevelPlan> {
    let start_vertex = problem.start[entity];
    let start_status = initial_status(start_vertex, task.as_ref());
    let start_state = State {
        time: 0,
        vertex: start_vertex,
        status: start_status,
    };
    let last_goal_constraint = task
        .as_ref()
        .and_then(|t| constraints.last_constraint_at(t.goal));

    let h0 = heuristic(shortest, start_vertex, start_status, task.as_ref())?;
    let root = Rc::new(NodeData {
        state: start_state,
        g: 0,
        parent: None,
    });

    let mut open = BinaryHeap::new();
    open.push(HeapEntry {
        f: h0,
        g: 0,
        node: root,
    });
    let mut best_g: HashMap<State, usize> = HashMap::new();

    while let Some(HeapEntry { g, node, .. }) = open.pop() {
        let state = node.state;
        if let Some(&recorded) = best_g.get(&state) {
            if g > recorded {
                continue;
            }
        }

        if is_solution(state, task.as_ref(), last_goal_constraint) {
            return Some(LowLevelPlan {
                positions: reconstruct(&node),
                cost: state.time,
            });
        }
        if state.time >= max_time {
            continue;
        }

        let next_time = state.time + 1;
        let next_stat = next_status(state.vertex, state.status, task.as_ref());

        let mut candidates = vec![state.vertex];
        candidates.extend(problem.adj[state.vertex].iter().copied());

        for &to in &candidates {
            if constraints.forbids_vertex(next_time, to) {
                continue;
            }
            if to != state.vertex && constraints.forbids_edge(state.time, state.vertex, to) {
                continue;
            }
            let succ_state = State {
                time: next_time,
                vertex: to,
                status: next_stat,
            };
            let Some(h) = heuristic(shortest, to, next_stat, task.as_ref()) else {
                continue;
            };
            let g2 = g + 1;
            let better = best_g
                .get(&succ_state)
                .map(|&recorded| g2 < recorded)
                .unwrap_or(true);
            if better {
                best_g.insert(succ_state, g2);
                let succ_node = Rc::new(NodeData {
                    state: succ_state,
                    g: g2,
                    parent: Some(node.clone()),
                });
                open.push(HeapEntry {
                    f: g2 + h,
                    g: g2,
                    node: succ_node,
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_with_no_task_stays_put() {
        let p = Problem::new_grid(3, vec![0], vec![], vec![]);
        let sp = ShortestPaths::build(&p);
        let plan = search(&p, &sp, 0, None, &Constraints::default(), 10).unwrap();
        assert_eq!(plan.cost, 0);
        assert_eq!(plan.positions, vec![0]);
    }

    #[test]
    fn agent_completes_a_simple_delivery() {
        let p = Problem::new_grid(3, vec![0], vec![], vec![]);
        let sp = ShortestPaths::build(&p);
        let task = Task {
            container: 0,
            start: 4,
            goal: 8,
        };
        let plan = search(&p, &sp, 0, Some(task), &Constraints::default(), 20).unwrap();
        assert_eq!(plan.positions.first(), Some(&0));
        assert_eq!(plan.positions.last(), Some(&8));
    }

    #[test]
    fn vertex_constraint_forces_a_detour() {
        let p = Problem::new_grid(3, vec![0], vec![], vec![]);
        let sp = ShortestPaths::build(&p);
        let task = Task {
            container: 0,
            start: 1,
            goal: 1,
        };
        let mut constraints = Constraints::default();
        constraints.vertex.insert(super::super::constraints::VertexConstraint { time: 1, vertex: 1 });
        let plan = search(&p, &sp, 0, Some(task), &constraints, 20).unwrap();
        assert_ne!(plan.positions.get(1), Some(&1));
    }
}
