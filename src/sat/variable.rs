use std::collections::HashMap;

/// Tagged SAT variable, mirroring `Solver.hpp`'s `Var` struct. Each variant
/// corresponds to one of the source's `enum { VERTEX, EDGE, AUXILIARY,
/// ASSIGNMENT }` tags; `Auxiliary` variables are the ones introduced by the
/// sequential at-most-one encoding and the move-variable transport encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Var {
    /// entity `e` occupies vertex `v` at time `t`.
    Vertex { e: usize, v: usize, t: usize },
    /// agent `a` traverses edge `from -> to` during step `t` (only used when
    /// `edge_vars` is enabled).
    Edge {
        a: usize,
        from: usize,
        to: usize,
        t: usize,
    },
    /// container `c` is assigned to agent `a` (only used when `fixed_agent`
    /// or `fixed_container` is enabled).
    Assignment { c: usize, a: usize },
    /// an auxiliary variable, identified by a counter value that is unique
    /// within one `Encoder`'s lifetime.
    Auxiliary(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lit {
    pub var: Var,
    pub positive: bool,
}

impl Lit {
    pub fn pos(var: Var) -> Self {
        Lit {
            var,
            positive: true,
        }
    }

    pub fn neg(var: Var) -> Self {
        Lit {
            var,
            positive: false,
        }
    }
}

impl std::ops::Not for Lit {
    type Output = Lit;
    fn not(self) -> Lit {
        Lit {
            var: self.var,
            positive: !self.positive,
        }
    }
}

/// Interns `Var`s into dense `0..n` backend variable indices, and keeps the
/// reverse mapping needed to read a satisfying assignment back out (`srav`
/// in `Solver.hpp`).
#[derive(Debug, Default)]
pub struct VariableRegistry {
    forward: HashMap<Var, u32>,
    reverse: Vec<Var>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `var`, allocating a fresh backend index if this is the first
    /// time it's been seen. Mirrors `Solver.hpp::to_cms`.
    pub fn intern(&mut self, var: Var) -> u32 {
        if let Some(&id) = self.forward.get(&var) {
            return id;
        }
        let id = self.reverse.len() as u32;
        self.forward.insert(var, id);
        self.reverse.push(var);
        id
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    pub fn var_at(&self, id: u32) -> Option<Var> {
        self.reverse.get(id as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut reg = VariableRegistry::new();
        let v = Var::Vertex { e: 0, v: 1, t: 2 };
        let id1 = reg.intern(v);
        let id2 = reg.intern(v);
        assert_eq!(id1, id2);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn distinct_vars_get_distinct_ids() {
        let mut reg = VariableRegistry::new();
        let a = reg.intern(Var::Vertex { e: 0, v: 0, t: 0 });
        let b = reg.intern(Var::Vertex { e: 0, v: 1, t: 0 });
        assert_ne!(a, b);
    }

    #[test]
    fn var_at_round_trips() {
        let mut reg = VariableRegistry::new();
        let v = Var::Assignment { c: 2, a: 5 };
        let id = reg.intern(v);
        assert_eq!(reg.var_at(id), Some(v));
    }
}
