use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand, ValueEnum};

/// Which solver core to run against the instance.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Optimal SAT-based solver (`sat/driver.rs`).
    Sat,
    /// Conflict-Based Search with Task Assignment (`cbsta/highlevel.rs`).
    CbsTa,
}

/// AMO (at-most-one) encoding strategy for the SAT solver, mirroring
/// `Solver.hpp::Config::amo`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmoEncoding {
    Binomial,
    Sequential,
}

/// `solve` (the default, implicit mode) runs one solver against one
/// instance; `bench` sweeps a list of deterministically generated instances
/// and appends one CSV row per run, grounded on the base repository's
/// `Stats::print` append-mode file write.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sweep a list of generator specs ("grid,b,a,c,seed" each), solving
    /// every instance with the flags given on the outer command and
    /// appending one CSV row per run to `--output-path`.
    Bench {
        #[arg(long = "spec", value_name = "grid,b,a,c,seed", required = true, num_args = 1..)]
        specs: Vec<String>,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "Rust MAPD solver",
    about = "SAT-based and CBS-TA solvers for multi-agent pickup-and-delivery.",
    version = "1.0"
)]
pub struct Cli {
    /// Absent: solve one instance (the implicit `solve` mode). Present:
    /// run the named subcommand instead.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to a serialized instance (YAML/JSON); mutually exclusive with
    /// `--generate`.
    #[arg(long)]
    pub instance_path: Option<PathBuf>,

    /// Deterministically generate an instance instead of loading one:
    /// "grid,blockades,agents,containers,seed".
    #[arg(long, value_name = "grid,b,a,c,seed")]
    pub generate: Option<String>,

    #[arg(long, help = "Path to append CSV stats to")]
    pub output_path: Option<PathBuf>,

    #[arg(long, help = "Path to write the found solution (YAML)")]
    pub solution_path: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SolverKind::Sat)]
    pub solver: SolverKind,

    // --- SAT driver options (Solver.hpp::Config) ---
    #[arg(long, help = "Run the BFS preprocessor / unit-clause pruning", default_value_t = true)]
    pub prep: bool,

    #[arg(long, help = "Exponential search growth factor", default_value_t = 2.0)]
    pub exp_factor: f64,

    #[arg(long, value_enum, default_value_t = AmoEncoding::Sequential)]
    pub amo_encoding: AmoEncoding,

    #[arg(long, help = "Use per-agent edge variables", default_value_t = false)]
    pub edge_vars: bool,

    #[arg(long, help = "Use per-edge move variables (requires edge_vars)", default_value_t = false)]
    pub move_vars: bool,

    #[arg(long, help = "A container is carried by at most one agent", default_value_t = false)]
    pub fixed_agent: bool,

    #[arg(long, help = "An agent carries at most one container", default_value_t = false)]
    pub fixed_container: bool,

    #[arg(long, default_value_t = 4)]
    pub n_threads: u32,

    #[arg(long, help = "Maximum makespan horizon ever attempted", default_value_t = 256)]
    pub max_makespan: usize,

    #[arg(long, help = "Maximum formula size in literals", default_value_t = 1_000_000_000)]
    pub max_literals: usize,

    #[arg(long, default_value_t = true)]
    pub edge_reservation: bool,

    #[arg(long, default_value_t = true)]
    pub transport: bool,

    // --- CBS-TA options ---
    #[arg(long, help = "Suboptimal limit for low-level A*")]
    pub low_level_sub_optimal: Option<f64>,

    #[arg(long, help = "Suboptimal limit for high-level search")]
    pub high_level_sub_optimal: Option<f64>,

    #[arg(long, default_value_t = false)]
    pub op_prioritize_conflicts: bool,

    #[arg(long, default_value_t = false)]
    pub op_bypass_conflicts: bool,

    #[arg(long, default_value_t = false)]
    pub op_target_reasoning: bool,

    /// Maximum number of task re-assignments CBS-TA will request from the
    /// ranked matcher (`m_maxTaskAssignments` in the original).
    #[arg(long, default_value_t = 64)]
    pub max_task_assignments: usize,

    #[arg(long, help = "Timeout seconds", default_value_t = 60)]
    pub timeout_secs: u64,

    #[arg(long, default_value_t = true)]
    pub log: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub command: Option<Command>,
    pub instance_path: Option<PathBuf>,
    pub generate: Option<(usize, usize, usize, usize, String)>,
    pub output_path: Option<PathBuf>,
    pub solution_path: Option<PathBuf>,
    pub solver: SolverKind,

    pub prep: bool,
    pub exp_factor: f64,
    pub amo_encoding: AmoEncoding,
    pub edge_vars: bool,
    pub move_vars: bool,
    pub fixed_agent: bool,
    pub fixed_container: bool,
    pub n_threads: u32,
    pub max_makespan: usize,
    pub max_literals: usize,
    pub edge_reservation: bool,
    pub transport: bool,

    pub low_level_sub_optimal: Option<f64>,
    pub high_level_sub_optimal: Option<f64>,
    pub op_prioritize_conflicts: bool,
    pub op_bypass_conflicts: bool,
    pub op_target_reasoning: bool,
    pub max_task_assignments: usize,

    pub timeout_secs: u64,
    pub log: bool,
}

impl Config {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let generate = cli
            .generate
            .as_ref()
            .map(|spec| parse_generate_spec(spec))
            .transpose()?;

        Ok(Self {
            command: cli.command.clone(),
            instance_path: cli.instance_path.clone(),
            generate,
            output_path: cli.output_path.clone(),
            solution_path: cli.solution_path.clone(),
            solver: cli.solver,
            prep: cli.prep,
            exp_factor: cli.exp_factor,
            amo_encoding: cli.amo_encoding,
            edge_vars: cli.edge_vars,
            move_vars: cli.move_vars,
            fixed_agent: cli.fixed_agent,
            fixed_container: cli.fixed_container,
            n_threads: cli.n_threads,
            max_makespan: cli.max_makespan,
            max_literals: cli.max_literals,
            edge_reservation: cli.edge_reservation,
            transport: cli.transport,
            low_level_sub_optimal: cli.low_level_sub_optimal,
            high_level_sub_optimal: cli.high_level_sub_optimal,
            op_prioritize_conflicts: cli.op_prioritize_conflicts,
            op_bypass_conflicts: cli.op_bypass_conflicts,
            op_target_reasoning: cli.op_target_reasoning,
            max_task_assignments: cli.max_task_assignments,
            timeout_secs: cli.timeout_secs,
            log: cli.log,
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match &self.command {
            Some(Command::Bench { specs }) => {
                if specs.is_empty() {
                    return Err(anyhow!("bench requires at least one --spec"));
                }
                if self.instance_path.is_some() || self.generate.is_some() {
                    return Err(anyhow!(
                        "bench draws its instances from --spec, not --instance-path/--generate"
                    ));
                }
                if self.output_path.is_none() {
                    return Err(anyhow!("bench requires --output-path to append CSV rows to"));
                }
            }
            None => {
                if self.instance_path.is_none() && self.generate.is_none() {
                    return Err(anyhow!(
                        "either --instance-path or --generate must be provided"
                    ));
                }
                if self.instance_path.is_some() && self.generate.is_some() {
                    return Err(anyhow!(
                        "--instance-path and --generate are mutually exclusive"
                    ));
                }
            }
        }

        if (self.fixed_agent || self.fixed_container) && (self.edge_vars || self.move_vars) {
            return Err(anyhow!(
                "fixed_agent/fixed_container cannot be combined with edge_vars/move_vars"
            ));
        }
        if self.move_vars && !self.edge_vars {
            return Err(anyhow!("move_vars requires edge_vars"));
        }

        match self.solver {
            SolverKind::CbsTa => {
                if let Some(v) = self.low_level_sub_optimal {
                    if v < 1.0 {
                        return Err(anyhow!(
                            "low_level_sub_optimal must be >= 1.0, got {}",
                            v
                        ));
                    }
                }
                if let Some(v) = self.high_level_sub_optimal {
                    if v < 1.0 {
                        return Err(anyhow!(
                            "high_level_sub_optimal must be >= 1.0, got {}",
                            v
                        ));
                    }
                }
            }
            SolverKind::Sat => {
                if self.exp_factor <= 1.0 {
                    return Err(anyhow!(
                        "exp_factor must be greater than 1.0, got {}",
                        self.exp_factor
                    ));
                }
            }
        }

        Ok(())
    }
}

pub fn parse_generate_spec(spec: &str) -> anyhow::Result<(usize, usize, usize, usize, String)> {
    let parts: Vec<&str> = spec.split(',').collect();
    if parts.len() != 5 {
        return Err(anyhow!(
            "--generate expects \"grid,b,a,c,seed\", got \"{}\"",
            spec
        ));
    }
    let grid = parts[0]
        .parse()
        .map_err(|_| anyhow!("invalid grid size: {}", parts[0]))?;
    let b = parts[1]
        .parse()
        .map_err(|_| anyhow!("invalid blockade count: {}", parts[1]))?;
    let a = parts[2]
        .parse()
        .map_err(|_| anyhow!("invalid agent count: {}", parts[2]))?;
    let c = parts[3]
        .parse()
        .map_err(|_| anyhow!("invalid container count: {}", parts[3]))?;
    Ok((grid, b, a, c, parts[4].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli::parse_from(["mapd", "--generate", "8,2,3,3,seed"])
    }

    #[test]
    fn validate_requires_an_instance_source() {
        let mut cli = base_cli();
        cli.generate = None;
        let config = Config::new(&cli).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_move_vars_without_edge_vars() {
        let mut cli = base_cli();
        cli.move_vars = true;
        let config = Config::new(&cli).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_fixed_agent_with_edge_vars() {
        let mut cli = base_cli();
        cli.fixed_agent = true;
        cli.edge_vars = true;
        let config = Config::new(&cli).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_generate_spec_rejects_wrong_arity() {
        assert!(parse_generate_spec("1,2,3").is_err());
    }

    #[test]
    fn parse_generate_spec_parses_valid_spec() {
        let (grid, b, a, c, seed) = parse_generate_spec("8,2,3,3,myseed").unwrap();
        assert_eq!((grid, b, a, c, seed.as_str()), (8, 2, 3, 3, "myseed"));
    }

    #[test]
    fn validate_rejects_bench_without_output_path() {
        let cli = Cli::parse_from(["mapd", "bench", "--spec", "8,2,3,3,seed"]);
        let config = Config::new(&cli).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bench_combined_with_generate() {
        let mut cli = Cli::parse_from(["mapd", "bench", "--spec", "8,2,3,3,seed"]);
        cli.output_path = Some("/tmp/bench.csv".into());
        cli.generate = Some("8,2,3,3,seed".to_string());
        let config = Config::new(&cli).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_a_well_formed_bench_invocation() {
        let mut cli = Cli::parse_from(["mapd", "bench", "--spec", "8,2,3,3,seed"]);
        cli.output_path = Some("/tmp/bench.csv".into());
        let config = Config::new(&cli).unwrap();
        assert!(config.validate().is_ok());
    }
}
