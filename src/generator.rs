//! Deterministic instance generation.
//!
//! Bit-for-bit port of `Problem.hpp`'s templated random constructor: the same
//! string hash, the same seeded Mersenne Twister, and the same (non-standard)
//! Fisher-Yates variant that always takes its modulus against the full slice
//! length rather than the shrinking `i+1`.

use rand::RngCore;
use rand_mt::Mt19937GenRand32;

use crate::problem::Problem;

/// Java-style `String.hashCode`, as used by `util.hpp::hashCode`: `res = 1`,
/// then `res = 31*res + byte` over every byte of the string, wrapping on
/// 32-bit overflow.
pub fn hash_code(s: &str) -> u32 {
    if s.is_empty() {
        return 0;
    }
    let mut res: u32 = 1;
    for b in s.bytes() {
        res = res.wrapping_mul(31).wrapping_add(b as u32);
    }
    res
}

/// `util.hpp::shuffle_`: Fisher-Yates over `slice[..len]`, but the swap
/// partner is drawn modulo the *full* `len` at every step, not `i+1`.
fn shuffle_(slice: &mut [usize], rng: &mut Mt19937GenRand32) {
    let len = slice.len();
    if len == 0 {
        return;
    }
    for i in (1..len).rev() {
        let j = (rng.next_u32() as usize) % len;
        slice.swap(i, j);
    }
}

/// Builds the seed string `"{grid},{b},{a},{c},{seed}"` and derives the
/// Mersenne Twister seed from it, matching the original constructor's
/// `std::stringstream` concatenation.
fn seeded_rng(grid: usize, b: usize, a: usize, c: usize, seed: &str) -> Mt19937GenRand32 {
    let joined = format!("{},{},{},{},{}", grid, b, a, c, seed);
    Mt19937GenRand32::new(hash_code(&joined))
}

/// Generates a quadratic-grid instance with `c` containers, `a` agents and
/// `b` blockades, deterministically from `seed`. Mirrors
/// `Problem.hpp`'s `Problem(int grid, int b, int a, int c, T seed)`.
pub fn generate(grid: usize, b: usize, a: usize, c: usize, seed: &str) -> Problem {
    let mut rng = seeded_rng(grid, b, a, c, seed);
    let mut nodes: Vec<usize> = (0..grid * grid).collect();

    shuffle_(&mut nodes, &mut rng);
    let mut start = vec![0usize; c + a];
    start[..c].copy_from_slice(&nodes[..c]);

    let restricted_len = nodes.len() - b;
    shuffle_(&mut nodes[..restricted_len], &mut rng);
    start[c..c + a].copy_from_slice(&nodes[..a]);

    shuffle_(&mut nodes[..restricted_len], &mut rng);
    let goal = nodes[..c].to_vec();

    let blockades = nodes[restricted_len..].to_vec();

    Problem::new_grid(grid, start, goal, blockades)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_code_matches_java_string_hash_code() {
        // "" -> 0 by definition; "a" -> 1*31 + 97 = 128; "ab" -> 128*31 + 98 = 4066.
        assert_eq!(hash_code(""), 0);
        assert_eq!(hash_code("a"), 128);
        assert_eq!(hash_code("ab"), 4066);
    }

    #[test]
    fn generate_is_deterministic_for_same_seed() {
        let p1 = generate(4, 1, 2, 2, "seed-1");
        let p2 = generate(4, 1, 2, 2, "seed-1");
        assert_eq!(p1.start, p2.start);
        assert_eq!(p1.goal, p2.goal);
        assert_eq!(p1.edges, p2.edges);
    }

    #[test]
    fn generate_differs_across_seeds() {
        let p1 = generate(5, 0, 2, 2, "a");
        let p2 = generate(5, 0, 2, 2, "b");
        assert!(p1.start != p2.start || p1.goal != p2.goal);
    }

    #[test]
    fn generate_respects_entity_counts() {
        let p = generate(6, 3, 4, 5, "counts");
        assert_eq!(p.num_containers, 5);
        assert_eq!(p.num_agents, 4);
        assert_eq!(p.start.len(), 9);
        assert_eq!(p.goal.len(), 5);
    }

    #[test]
    fn generate_blockades_have_no_incident_edges() {
        let p = generate(5, 3, 2, 2, "block");
        // recover the blockade set the same way the generator derives it.
        let mut rng = seeded_rng(5, 3, 2, 2, "block");
        let mut nodes: Vec<usize> = (0..25).collect();
        shuffle_(&mut nodes, &mut rng);
        let restricted_len = nodes.len() - 3;
        shuffle_(&mut nodes[..restricted_len], &mut rng);
        shuffle_(&mut nodes[..restricted_len], &mut rng);
        let blockades = &nodes[restricted_len..];
        for &blocked in blockades {
            for &(u, v) in &p.edges {
                assert_ne!(u, blocked);
                assert_ne!(v, blocked);
            }
        }
    }
}
