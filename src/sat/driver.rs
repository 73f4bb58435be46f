use std::time::{Duration, Instant};

use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::SolveError;
use crate::problem::Problem;
use crate::solution::Solution;
use crate::stat::Stats;

use super::backend::SatOutcome;
use super::encoder::Encoder;

/// Runs the exponential-then-binary makespan search of `Solver.hpp::solve()`
/// against one `Problem`, returning the optimal `Solution`.
#[instrument(skip_all, fields(num_vertices = problem.num_vertices, num_entities = problem.num_entities()))]
pub fn solve(problem: &Problem, config: &Config) -> Result<Solution, SolveError> {
    let wall_clock = Instant::now();
    let mut stats = Stats::default();

    let bound_start = Instant::now();
    let bound = if config.prep {
        problem.bound(config.transport)
    } else {
        Some((
            0,
            vec![vec![None; problem.num_vertices]; problem.num_entities()],
        ))
    };
    stats.add_bound(bound_start.elapsed());

    let (l0, dist) = bound.ok_or(SolveError::Unsolvable)?;
    stats.initial_bound = l0;
    stats.lower_bound = l0;
    debug!(initial_bound = l0, "bfs preprocessing complete");

    let mut encoder = Encoder::new(problem, dist, config);
    let extend_start = Instant::now();
    encoder.origin_and_assignment_amos(&mut stats)?;
    encoder.extend(l0, &mut stats)?;
    stats.add_extend(extend_start.elapsed());

    let deadline = Instant::now() + Duration::from_secs(config.timeout_secs);

    let mut l = l0;
    let mut t = l0;
    while !try_solve(&mut encoder, t, &mut stats, deadline, config)? {
        l = t;
        t = ((t as f64 * config.exp_factor).ceil() as usize).max(1);
    }
    let mut r = t;
    while l + 1 < r {
        let m = (l + r) / 2;
        if try_solve(&mut encoder, m, &mut stats, deadline, config)? {
            r = m;
        } else {
            l = m;
        }
    }

    stats.t_total_ms = wall_clock.elapsed().as_millis() as u64;
    info!(makespan = r, "found optimal solution");

    let paths = encoder.extract_paths(r);
    Ok(Solution {
        makespan: r,
        paths,
        stats,
    })
}

fn try_solve(
    encoder: &mut Encoder,
    t: usize,
    stats: &mut Stats,
    deadline: Instant,
    config: &Config,
) -> Result<bool, SolveError> {
    if t > config.max_makespan {
        return Err(SolveError::MakespanExceeded {
            stats: Box::new(stats.clone()),
            max_makespan: config.max_makespan,
        });
    }

    let extend_start = Instant::now();
    encoder.extend(t, stats)?;
    let assumptions = encoder.destination(t);
    stats.add_extend(extend_start.elapsed());

    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(SolveError::Timeout {
            stats: Box::new(stats.clone()),
            timeout_s: config.timeout_secs,
        });
    }

    let solve_start = Instant::now();
    let outcome = encoder.solve_with_assumptions(&assumptions, remaining);
    stats.add_solver(solve_start.elapsed());

    match outcome {
        SatOutcome::Sat => {
            stats.upper_bound = Some(t);
            Ok(true)
        }
        SatOutcome::Unsat => {
            stats.lower_bound = t + 1;
            Ok(false)
        }
        SatOutcome::Unknown => Err(SolveError::Timeout {
            stats: Box::new(stats.clone()),
            timeout_s: config.timeout_secs,
        }),
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

    #[test]
    fn unsolvable_instance_is_reported() {
        // Container isolated: neighbours 1 and 3 of vertex 0 are blocked.
        let problem = Problem::new_grid(3, vec![0, 2, 6], vec![8], vec![1, 3]);
        let config = test_config();
        let result = solve(&problem, &config);
        assert!(matches!(result, Err(SolveError::Unsolvable)));
    }

    #[test]
    fn trivial_instance_solves_at_makespan_zero() {
        // Container already at its goal, agent already where it needs to be.
        let problem = Problem::new_grid(2, vec![0, 1], vec![0], vec![]);
        let config = test_config();
        let solution = solve(&problem, &config).expect("trivial instance is solvable");
        assert_eq!(solution.makespan, 0);
    }
}
