//! Command-line interface and the experiment runner
//!
//! Runs one solver per instance file, supervises the wall-clock timeout
//! through the cooperative cancellation token, and writes a `_result.json`
//! record next to each instance. Exit codes: 0 solved or finished, 1 timed
//! out, 2 output file already exists, -1 missing input or a fatal instance
//! error.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};

use crate::board::Board;
use crate::io::configuration::{DEFAULT_SEED, OUTPUT_SUFFIX};
use crate::io::error::{Result, SolverError};
use crate::io::instance::{encode_instance, read_instance};
use crate::io::progress::ProgressManager;
use crate::io::solution::{PhaseTimer, SolutionData, peak_rss_bytes, write_solution};
use crate::planner::assembly::OneTileAtATimePlanner;
use crate::planner::heuristic::{HeuristicKind, SingleTileHeuristicKind};
use crate::planner::rrt::{DistanceMetric, RrtSolver};
use crate::planner::search::{BfsPlanner, get_motion_planner};
use crate::planner::{CancelToken, Instance, PlannerConfig, Solver};
use crate::spatial::Direction;

/// Selectable solver algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SolverKind {
    /// Best-first search with a whole-board heuristic
    Default,
    /// Plain breadth-first search
    Bfs,
    /// One-tile-at-a-time construction
    Tileatatime,
    /// RRT configuration-space exploration
    Rrt,
}

/// Command-line arguments of the experiment runner
#[derive(Debug, Parser)]
#[command(
    name = "tiltplan",
    version,
    about = "Solve tilt assembly instances of the polyomino construction problem"
)]
pub struct Cli {
    /// Instance file or directory of instance files
    #[arg(value_name = "IN")]
    pub input: PathBuf,

    /// Output file path
    #[arg(short = 'o', long = "out", value_name = "OUT")]
    pub out: Option<PathBuf>,

    /// Output directory (required when the input is a directory)
    #[arg(long, value_name = "DIR")]
    pub outdir: Option<PathBuf>,

    /// Maximum seconds per instance; unlimited by default
    #[arg(short = 't', long, value_name = "T")]
    pub timeout: Option<u64>,

    /// Record phase timings into the result file
    #[arg(short = 'p', long)]
    pub profile: bool,

    /// Solver algorithm
    #[arg(short = 's', long, value_enum, default_value_t = SolverKind::Default)]
    pub solver: SolverKind,

    /// Heuristic name; defaults depend on the solver
    #[arg(long, value_name = "NAME")]
    pub heuristic: Option<String>,

    /// Seed for every pseudorandom choice
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

fn build_solver(
    cli: &Cli,
    instance: &Instance,
    config: &PlannerConfig,
    token: CancelToken,
) -> Result<Box<dyn Solver>> {
    match cli.solver {
        SolverKind::Bfs => Ok(Box::new(BfsPlanner::new(instance, token))),
        SolverKind::Default => {
            let kind = match cli.heuristic.as_deref() {
                None => HeuristicKind::WeightedDistanceSum,
                Some(name) => HeuristicKind::from_name(name).ok_or_else(|| {
                    SolverError::InvalidInstance {
                        reason: format!("unknown heuristic '{name}'"),
                    }
                })?,
            };
            Ok(Box::new(get_motion_planner(
                instance, kind, None, config, token,
            )))
        }
        SolverKind::Tileatatime => {
            let kind = match cli.heuristic.as_deref() {
                None => SingleTileHeuristicKind::MinimumMovesAndTargetArea,
                Some(name) => SingleTileHeuristicKind::from_name(name).ok_or_else(|| {
                    SolverError::InvalidInstance {
                        reason: format!("unknown single-tile heuristic '{name}'"),
                    }
                })?,
            };
            Ok(Box::new(OneTileAtATimePlanner::new(
                instance,
                kind,
                config.clone(),
                token,
            )))
        }
        SolverKind::Rrt => {
            let metric = match cli.heuristic.as_deref() {
                None => DistanceMetric::Hausdorff,
                Some(name) => DistanceMetric::from_name(name).ok_or_else(|| {
                    SolverError::InvalidInstance {
                        reason: format!("unknown distance metric '{name}'"),
                    }
                })?,
            };
            Ok(Box::new(RrtSolver::new(
                instance,
                metric,
                None,
                config.clone(),
                token,
            )))
        }
    }
}

struct RunOutcome {
    solution: Option<Vec<Direction>>,
    timed_out: bool,
    number_of_nodes: usize,
}

/// Run a boxed solver, supervising the optional wall-clock timeout
fn supervise(
    solver: Box<dyn Solver>,
    timeout: Option<Duration>,
    token: &CancelToken,
) -> Result<RunOutcome> {
    let Some(limit) = timeout else {
        let mut solver = solver;
        return finish(solver.solve(), &mut solver, false);
    };

    let (sender, receiver) = mpsc::channel();
    let handle = thread::spawn(move || {
        let mut solver = solver;
        let outcome = solver.solve();
        let _ = sender.send(());
        (solver, outcome)
    });

    let supervisor_timed_out = receiver.recv_timeout(limit).is_err();
    if supervisor_timed_out {
        token.cancel();
    }
    let Ok((mut solver, outcome)) = handle.join() else {
        return Err(SolverError::InvalidInstance {
            reason: "solver thread panicked".to_string(),
        });
    };
    finish(outcome, &mut solver, supervisor_timed_out)
}

// Allow print for user feedback on pre-computation timeouts
#[allow(clippy::print_stderr)]
fn finish(
    outcome: Result<Option<Vec<Direction>>>,
    solver: &mut Box<dyn Solver>,
    supervisor_timed_out: bool,
) -> Result<RunOutcome> {
    let number_of_nodes = solver.number_of_nodes();
    match outcome {
        Ok(solution) => Ok(RunOutcome {
            solution: if supervisor_timed_out {
                solver.extract_solution()
            } else {
                solution
            },
            timed_out: supervisor_timed_out,
            number_of_nodes,
        }),
        Err(err) if err.is_timeout() => Ok(RunOutcome {
            solution: solver.extract_solution(),
            timed_out: true,
            number_of_nodes,
        }),
        Err(SolverError::PreComputationTimeout { operation }) => {
            eprintln!("Pre-computation of {operation} timed out; no solution");
            Ok(RunOutcome {
                solution: None,
                timed_out: supervisor_timed_out,
                number_of_nodes,
            })
        }
        Err(fatal) => Err(fatal),
    }
}

/// Orchestrates solving one instance file or a directory of them
pub struct ExperimentRunner {
    cli: Cli,
}

impl ExperimentRunner {
    /// Create a runner from parsed arguments
    pub const fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run and return the process exit code
    // Allow print for user feedback on input and output problems
    #[allow(clippy::print_stderr)]
    pub fn run(&self) -> i32 {
        if self.cli.input.is_dir() {
            return self.run_directory();
        }
        if !self.cli.input.is_file() {
            eprintln!("Input file not found: {}", self.cli.input.display());
            return -1;
        }

        let output = self.single_output_path();
        if output.exists() {
            eprintln!("Output file already exists: {}", output.display());
            return 2;
        }
        match self.run_single(&self.cli.input, &output) {
            Ok(timed_out) => i32::from(timed_out),
            Err(err) => {
                eprintln!("{err}");
                -1
            }
        }
    }

    fn single_output_path(&self) -> PathBuf {
        if let Some(out) = &self.cli.out {
            return out.clone();
        }
        let stem = self
            .cli
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = format!("{stem}{OUTPUT_SUFFIX}.json");
        self.cli
            .outdir
            .as_ref()
            .map_or_else(|| Path::new("results").join(&name), |dir| dir.join(&name))
    }

    // Allow print for user feedback on skipped and failed instances
    #[allow(clippy::print_stderr)]
    fn run_directory(&self) -> i32 {
        let Some(outdir) = &self.cli.outdir else {
            eprintln!("Input directory requires the --outdir argument");
            return -1;
        };
        if !outdir.is_dir() && std::fs::create_dir_all(outdir).is_err() {
            eprintln!("Failed to create output directory: {}", outdir.display());
            return -1;
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.cli.input)
            .map(|entries| {
                entries
                    .filter_map(std::result::Result::ok)
                    .map(|entry| entry.path())
                    .filter(|path| {
                        path.extension().and_then(|e| e.to_str()) == Some("json")
                            && !path
                                .file_stem()
                                .and_then(|s| s.to_str())
                                .is_some_and(|s| s.ends_with(OUTPUT_SUFFIX))
                    })
                    .collect()
            })
            .unwrap_or_default();
        files.sort();

        let progress = ProgressManager::new(files.len());
        for file in &files {
            progress.start_file(file);
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let output = outdir.join(format!("{stem}{OUTPUT_SUFFIX}.json"));
            if output.exists() {
                eprintln!("Skipping: {} (output exists)", file.display());
                progress.file_done();
                continue;
            }
            if let Err(err) = self.run_single(file, &output) {
                eprintln!("{}: {err}", file.display());
            }
            progress.file_done();
        }
        progress.finish();
        0
    }

    /// Solve one instance and write its result record
    ///
    /// Returns whether the run timed out.
    fn run_single(&self, input: &Path, output: &Path) -> Result<bool> {
        let mut timer = PhaseTimer::new();
        let instance = timer.time("read", || read_instance(input))?;

        let config = PlannerConfig {
            seed: self.cli.seed,
            ..PlannerConfig::default()
        };
        let token = CancelToken::new();
        let solver = build_solver(&self.cli, &instance, &config, token.clone())?;

        let started = Instant::now();
        let outcome = supervise(solver, self.cli.timeout.map(Duration::from_secs), &token)?;
        let time_needed = started.elapsed();
        timer.record("solve", time_needed);

        let mut data = SolutionData::new(outcome.solution.as_deref(), time_needed.as_secs_f64());
        data.timed_out = outcome.timed_out;
        if outcome.number_of_nodes > 0 {
            data.number_of_nodes = Some(outcome.number_of_nodes);
        }
        data.max_mem_usage = peak_rss_bytes();
        data.instance = Some(encode_instance(&instance));

        if self.cli.profile {
            data.runtime_profile = Some(timer.report());
        }
        write_solution(output, &data)?;

        Ok(outcome.timed_out)
    }
}

/// Execute a control sequence on a copy of a board, activating glues after
/// every pulse; returns the resulting board
pub fn execute_sequence(board: &Board, sequence: &[Direction]) -> Board {
    let mut board = board.clone();
    for direction in sequence {
        board.step(*direction);
        board.activate_glues();
    }
    board
}
