mod cbsta;
mod config;
mod error;
mod generator;
mod matching;
mod problem;
mod sat;
mod solution;
mod solver;
mod stat;

use std::fs;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Cli, Command, Config, parse_generate_spec};
use error::SolveError;
use problem::Problem;
use solution::Solution;

fn load_problem(config: &Config) -> anyhow::Result<Problem> {
    if let Some(path) = &config.instance_path {
        let text = fs::read_to_string(path)?;
        let problem = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&text)?
        } else {
            serde_yaml::from_str(&text)?
        };
        Ok(problem)
    } else {
        let (grid, b, a, c, seed) = config
            .generate
            .clone()
            .expect("Config::validate already enforces instance_path xor generate");
        Ok(generator::generate(grid, b, a, c, &seed))
    }
}

fn report_outcome(result: &Result<Solution, SolveError>, config: &Config) {
    match result {
        Ok(solution) => {
            tracing::info!(makespan = solution.makespan, "solved");
            solution.stats.print(config);
            if let Some(path) = &config.solution_path {
                if let Ok(yaml) = serde_yaml::to_string(solution) {
                    let _ = fs::write(path, yaml);
                }
            }
        }
        Err(err) => {
            if let Some(stats) = err.partial_stats() {
                stats.print(config);
            }
            match err {
                SolveError::Unsolvable => println!("unsolvable"),
                SolveError::Timeout { timeout_s, .. } => {
                    println!("timed out after {timeout_s}s")
                }
                SolveError::MakespanExceeded { max_makespan, .. } => {
                    println!("makespan exceeded maximum of {max_makespan}")
                }
                SolveError::FormulaTooLarge { max_literals, .. } => {
                    println!("formula exceeded maximum of {max_literals} literals")
                }
                SolveError::InvalidConfig(msg) => println!("invalid configuration: {msg}"),
            }
        }
    }
}

/// Solves one instance and prints/saves its result. The default (no
/// subcommand) mode.
fn run_solve(config: &Config) -> anyhow::Result<()> {
    let problem = load_problem(config)?;
    let result = solver::solve(&problem, config);
    report_outcome(&result, config);
    match result {
        Ok(_) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Sweeps a list of generator specs, solving each with the flags given on
/// the outer command and appending one CSV row per run via `Stats::print`.
fn run_bench(config: &Config, specs: &[String]) -> anyhow::Result<()> {
    for spec in specs {
        let (grid, b, a, c, seed) = parse_generate_spec(spec)?;
        tracing::info!(grid, b, a, c, seed = seed.as_str(), "bench run");
        let problem = generator::generate(grid, b, a, c, &seed);
        let result = solver::solve(&problem, config);
        report_outcome(&result, config);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::new(&cli)?;
    config.validate()?;

    if config.log {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "mapd_rust=info".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    match &config.command {
        Some(Command::Bench { specs }) => run_bench(&config, specs),
        None => run_solve(&config),
    }
}
