use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::assignment::Assignment;

/// One partition of the assignment search space: `i` forces specific
/// agent->task pairs, `o` forbids specific pairs, `iagents` forces an agent
/// to receive *some* task, `oagents` forces an agent to receive none.
/// Mirrors the `Node` type nested in `next_best_assignment.hpp`'s
/// `NextBestAssignment`.
#[derive(Debug, Clone)]
struct Node {
    i: HashMap<usize, usize>,
    o: HashSet<(usize, usize)>,
    iagents: HashSet<usize>,
    oagents: HashSet<usize>,
    solution: HashMap<usize, usize>,
    cost: i64,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}
impl Eq for Node {}
impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Node {
    // Reversed so `BinaryHeap` (a max-heap) pops the lowest cost first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.cmp(&self.cost)
    }
}

/// Murty-style ranked enumeration of bottleneck assignments, each call to
/// `next_solution` returning the next-cheapest matching consistent with the
/// partitioning explored so far. Grounded on
/// `next_best_assignment.hpp::NextBestAssignment`.
pub struct NextBestAssignment {
    costs: HashMap<(usize, usize), i64>,
    agents: Vec<usize>,
    tasks: Vec<usize>,
    open: BinaryHeap<Node>,
}

impl NextBestAssignment {
    pub fn new(agents: Vec<usize>, tasks: Vec<usize>) -> Self {
        NextBestAssignment {
            costs: HashMap::new(),
            agents,
            tasks,
            open: BinaryHeap::new(),
        }
    }

    pub fn set_cost(&mut self, agent: usize, task: usize, cost: i64) {
        self.costs.insert((agent, task), cost);
    }

    /// Rebuilds a fresh `Assignment` honouring the partition's constraints
    /// and solves it. Mirrors `NextBestAssignment::constrainedMatching`.
    fn constrained_matching(
        &self,
        i: &HashMap<usize, usize>,
        o: &HashSet<(usize, usize)>,
        iagents: &HashSet<usize>,
        oagents: &HashSet<usize>,
    ) -> Option<(HashMap<usize, usize>, i64)> {
        let mut assignment = Assignment::new();

        for (&a, &t) in i {
            let &c = self.costs.get(&(a, t))?;
            assignment.set_cost(a, t, c);
            assignment.prioritize_agent(a);
        }

        for &a in &self.agents {
            if oagents.contains(&a) || i.contains_key(&a) {
                continue;
            }
            let mut has_any = false;
            for &t in &self.tasks {
                if o.contains(&(a, t)) {
                    continue;
                }
                if let Some(&c) = self.costs.get(&(a, t)) {
                    assignment.set_cost(a, t, c);
                    has_any = true;
                }
            }
            if iagents.contains(&a) && has_any {
                assignment.prioritize_agent(a);
            }
        }

        let (matching, cost) = assignment.solve(i, 0)?;

        for (&a, &t) in i {
            if matching.get(&a) != Some(&t) {
                return None;
            }
        }
        for &a in iagents {
            if !matching.contains_key(&a) {
                return None;
            }
        }

        Some((matching, cost))
    }

    /// Seeds the ranked search with the globally cheapest matching.
    pub fn solve(&mut self) {
        if let Some((solution, cost)) = self.constrained_matching(
            &HashMap::new(),
            &HashSet::new(),
            &HashSet::new(),
            &HashSet::new(),
        ) {
            self.open.push(Node {
                i: HashMap::new(),
                o: HashSet::new(),
                iagents: HashSet::new(),
                oagents: HashSet::new(),
                solution,
                cost,
            });
        }
    }

    /// Pops the cheapest remaining matching and partitions the search space
    /// around it (one child branch per not-yet-fixed agent), so the next
    /// call returns the next-cheapest matching overall. Mirrors
    /// `NextBestAssignment::nextSolution`.
    pub fn next_solution(&mut self) -> Option<(HashMap<usize, usize>, i64)> {
        let top = self.open.pop()?;
        let result = (top.solution.clone(), top.cost);

        let fixed_agents: HashSet<usize> = top.i.keys().copied().collect();
        let mut running_i = top.i.clone();
        let mut running_oagents = top.oagents.clone();

        for &a in &self.agents {
            if fixed_agents.contains(&a) {
                continue;
            }

            let mut child_o = top.o.clone();
            let mut child_iagents = top.iagents.clone();
            match top.solution.get(&a) {
                Some(&t) => {
                    child_o.insert((a, t));
                }
                None => {
                    child_iagents.insert(a);
                }
            }

            if let Some((solution, cost)) =
                self.constrained_matching(&running_i, &child_o, &child_iagents, &running_oagents)
            {
                self.open.push(Node {
                    i: running_i.clone(),
                    o: child_o,
                    iagents: child_iagents,
                    oagents: running_oagents.clone(),
                    solution,
                    cost,
                });
            }

            match top.solution.get(&a) {
                Some(&t) => {
                    running_i.insert(a, t);
                }
                None => {
                    running_oagents.insert(a);
                }
            }
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranked_solutions_are_nondecreasing_in_cost() {
        let mut nba = NextBestAssignment::new(vec![0, 1, 2], vec![0, 1, 2]);
        let costs = [[3, 1, 4], [1, 5, 9], [2, 6, 5]];
        for a in 0..3 {
            for t in 0..3 {
                nba.set_cost(a, t, costs[a][t]);
            }
        }
        nba.solve();
        let mut last_cost = i64::MIN;
        let mut seen = 0;
        while let Some((_, cost)) = nba.next_solution() {
            assert!(cost >= last_cost);
            last_cost = cost;
            seen += 1;
            if seen >= 6 {
                break;
            }
        }
        assert!(seen > 0);
    }

    #[test]
    fn first_solution_is_the_cheapest_bottleneck_matching() {
        let mut nba = NextBestAssignment::new(vec![0, 1], vec![0, 1]);
        nba.set_cost(0, 0, 10);
        nba.set_cost(0, 1, 1);
        nba.set_cost(1, 0, 1);
        nba.set_cost(1, 1, 10);
        nba.solve();
        let (_, cost) = nba.next_solution().unwrap();
        assert_eq!(cost, 1);
    }
}
