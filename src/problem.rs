use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// A pickup-and-delivery instance on a directed graph.
///
/// Entities are indexed `0..c` for containers, `c..c+a` for agents, matching
/// `Problem.hpp`'s `C`, `A`, `C_u_A` ranges. `s`/`g` give the start vertex of
/// every entity and the goal vertex of every container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    /// Side length of the originating grid, if this instance was built on one.
    pub grid: Option<usize>,
    pub num_vertices: usize,
    /// Directed edges, stored in both directions for symmetric graphs.
    pub edges: Vec<(usize, usize)>,
    pub adj: Vec<Vec<usize>>,
    pub num_containers: usize,
    pub num_agents: usize,
    /// Start vertex of every entity, container indices first.
    pub start: Vec<usize>,
    /// Goal vertex of every container (length `num_containers`).
    pub goal: Vec<usize>,
}

impl Problem {
    pub fn num_entities(&self) -> usize {
        self.num_containers + self.num_agents
    }

    pub fn containers(&self) -> std::ops::Range<usize> {
        0..self.num_containers
    }

    pub fn agents(&self) -> std::ops::Range<usize> {
        self.num_containers..self.num_containers + self.num_agents
    }

    pub fn entities(&self) -> std::ops::Range<usize> {
        0..self.num_entities()
    }

    pub fn is_container(&self, e: usize) -> bool {
        e < self.num_containers
    }

    /// Constructs a grid graph, removing any vertex in `blockades` and all
    /// edges incident to it. Mirrors `Problem.hpp::make_grid`.
    pub fn grid_edges(grid: usize, blockades: &[usize]) -> (Vec<(usize, usize)>, Vec<Vec<usize>>) {
        let blocked: std::collections::HashSet<usize> = blockades.iter().copied().collect();
        let mut edges = Vec::new();
        for r in 0..grid {
            for c in 0..grid {
                if c < grid - 1 {
                    edges.push((grid * r + c, grid * r + c + 1));
                }
                if r < grid - 1 {
                    edges.push((grid * r + c, grid * (r + 1) + c));
                }
            }
        }
        let mut adj = vec![Vec::new(); grid * grid];
        let mut final_edges = Vec::new();
        for (u, v) in edges {
            if blocked.contains(&u) || blocked.contains(&v) {
                continue;
            }
            final_edges.push((u, v));
            adj[u].push(v);
            final_edges.push((v, u));
            adj[v].push(u);
        }
        (final_edges, adj)
    }

    /// A fully explicit grid instance with given start/goal/blockade vertices.
    /// Mirrors `Problem.hpp`'s first (explicit) constructor.
    pub fn new_grid(
        grid: usize,
        start: Vec<usize>,
        goal: Vec<usize>,
        blockades: Vec<usize>,
    ) -> Self {
        let num_containers = goal.len();
        let num_agents = start.len() - num_containers;
        let (edges, adj) = Self::grid_edges(grid, &blockades);
        Problem {
            grid: Some(grid),
            num_vertices: grid * grid,
            edges,
            adj,
            num_containers,
            num_agents,
            start,
            goal,
        }
    }

    /// A general-graph instance, for non-grid use cases (e.g. test fixtures).
    pub fn new_general(
        num_vertices: usize,
        directed_edges: Vec<(usize, usize)>,
        num_containers: usize,
        num_agents: usize,
        start: Vec<usize>,
        goal: Vec<usize>,
    ) -> Self {
        let mut adj = vec![Vec::new(); num_vertices];
        for &(u, v) in &directed_edges {
            adj[u].push(v);
        }
        Problem {
            grid: None,
            num_vertices,
            edges: directed_edges,
            adj,
            num_containers,
            num_agents,
            start,
            goal,
        }
    }

    /// BFS preprocessor: per-entity distance table, plus the feasibility lower
    /// bound used to seed the SAT driver's horizon search.
    ///
    /// Returns `None` if some container cannot reach its goal (or, when
    /// `pickup` is set, cannot reach any agent's start vertex) — mirroring
    /// `Problem.hpp::bound`'s `std::nullopt` return. On success, rebiases
    /// `dist[c][v]` for `v != start[c]` by the container's distance to the
    /// agent that must carry it, exactly as the original does in place.
    pub fn bound(&self, pickup: bool) -> Option<(usize, Vec<Vec<Option<usize>>>)> {
        let n = self.num_entities();
        let mut dist: Vec<Vec<Option<usize>>> = vec![vec![None; self.num_vertices]; n];
        let mut to_agent: Vec<Option<usize>> = vec![None; self.num_containers];
        let mut to_goal: Vec<Option<usize>> = vec![None; self.num_containers];

        for e in self.entities() {
            let mut q: VecDeque<(usize, usize)> = VecDeque::new();
            dist[e][self.start[e]] = Some(0);
            q.push_back((self.start[e], 0));
            while let Some((u, d)) = q.pop_front() {
                if self.is_container(e) {
                    if to_goal[e].is_none() && u == self.goal[e] {
                        to_goal[e] = Some(d);
                    }
                    if to_agent[e].is_none() {
                        for a in self.agents() {
                            if self.start[a] == u {
                                to_agent[e] = Some(d);
                                break;
                            }
                        }
                    }
                }
                for &v in &self.adj[u] {
                    if dist[e][v].is_some() {
                        continue;
                    }
                    dist[e][v] = Some(d + 1);
                    q.push_back((v, d + 1));
                }
            }
        }

        if !pickup {
            to_agent.iter_mut().for_each(|x| *x = Some(0));
        }

        let mut lower_bound = 0usize;
        for c in self.containers() {
            if self.start[c] == self.goal[c] {
                continue;
            }
            let (Some(tg), Some(ta)) = (to_goal[c], to_agent[c]) else {
                return None;
            };
            lower_bound = lower_bound.max(ta + tg);
            for v in 0..self.num_vertices {
                if v != self.start[c] {
                    if let Some(d) = dist[c][v].as_mut() {
                        *d += ta;
                    }
                }
            }
        }

        Some((lower_bound, dist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Figure 1 of the source material: a small grid with one container and
    /// two agents, all reachable.
    fn figure1() -> Problem {
        // 3x3 grid, container at 0 -> 8, agents at 2 and 6.
        Problem::new_grid(3, vec![0, 2, 6], vec![8], vec![])
    }

    #[test]
    fn bound_is_feasible_on_figure1() {
        let p = figure1();
        let (lb, dist) = p.bound(true).expect("figure1 is solvable");
        assert!(lb > 0);
        // container 0 must be able to reach an agent start and its goal.
        assert!(dist[0][0] == Some(0));
    }

    #[test]
    fn unsolvable_when_container_isolated() {
        // Container sits on an island: block every neighbour of 0.
        let p = Problem::new_grid(3, vec![0, 2, 6], vec![8], vec![1, 3]);
        assert!(p.bound(true).is_none());
    }

    #[test]
    fn bound_without_pickup_ignores_agent_reachability() {
        // 4x4 grid, column 2 (vertices 2,6,10,14) removed: splits the grid
        // into {0,1,4,5,8,9,12,13} and {3,7,11,15}. Container 0->5 lives
        // entirely in the first component; the agent starts in the second,
        // so it is unreachable from the container's BFS.
        let p = Problem::new_grid(4, vec![0, 3], vec![5], vec![2, 6, 10, 14]);
        assert!(p.bound(true).is_none());
        let (lb, _) = p.bound(false).expect("goal reachable without pickup");
        assert_eq!(lb, 2);
    }

    #[test]
    fn no_op_container_never_increases_bound() {
        let p = Problem::new_grid(3, vec![4, 0, 8], vec![4], vec![]);
        let (lb, _) = p.bound(true).unwrap();
        assert_eq!(lb, 0);
    }
}
