use std::collections::HashSet;

/// Forbids an entity from occupying `vertex` at `time`. Mirrors
/// `cbs_mapd.cpp::VertexConstraint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexConstraint {
    pub time: usize,
    pub vertex: usize,
}

/// Forbids an entity from traversing `from -> to` between `time` and
/// `time + 1`. Mirrors `cbs_mapd.cpp::EdgeConstraint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeConstraint {
    pub time: usize,
    pub from: usize,
    pub to: usize,
}

/// One agent's accumulated constraint set. Mirrors
/// `cbs_mapd.cpp::Constraints`.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub vertex: HashSet<VertexConstraint>,
    pub edge: HashSet<EdgeConstraint>,
}

impl Constraints {
    pub fn add(&mut self, other: &Constraints) {
        self.vertex.extend(other.vertex.iter().copied());
        self.edge.extend(other.edge.iter().copied());
    }

    /// True if any constraint is shared between `self` and `other`. Used by
    /// the high-level search's `assert(!overlap(...))` duplicate check.
    pub fn overlaps(&self, other: &Constraints) -> bool {
        self.vertex.intersection(&other.vertex).next().is_some()
            || self.edge.intersection(&other.edge).next().is_some()
    }

    pub fn forbids_vertex(&self, time: usize, vertex: usize) -> bool {
        self.vertex.contains(&VertexConstraint { time, vertex })
    }

    pub fn forbids_edge(&self, time: usize, from: usize, to: usize) -> bool {
        self.edge.contains(&EdgeConstraint { time, from, to })
    }

    /// The latest time any vertex constraint touches `goal`, used by
    /// `isSolution` to decide whether an agent may stop there yet. Mirrors
    /// `cbs_mapd.cpp::Environment::m_lastGoalConstraint`.
    pub fn last_constraint_at(&self, goal: usize) -> Option<usize> {
        self.vertex
            .iter()
            .filter(|c| c.vertex == goal)
            .map(|c| c.time)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_detects_shared_vertex_constraint() {
        let mut a = Constraints::default();
        a.vertex.insert(VertexConstraint { time: 1, vertex: 2 });
        let mut b = Constraints::default();
        b.vertex.insert(VertexConstraint { time: 1, vertex: 2 });
        assert!(a.overlaps(&b));
    }

    #[test]
    fn last_constraint_at_picks_the_maximum_time() {
        let mut c = Constraints::default();
        c.vertex.insert(VertexConstraint { time: 1, vertex: 5 });
        c.vertex.insert(VertexConstraint { time: 4, vertex: 5 });
        c.vertex.insert(VertexConstraint { time: 2, vertex: 9 });
        assert_eq!(c.last_constraint_at(5), Some(4));
        assert_eq!(c.last_constraint_at(100), None);
    }
}
