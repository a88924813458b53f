use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use ts_core::{CoreError, micros_from_secs, secs_from_micros};
use ts_plumbing::{EngineError, PlumbingEngine, Pressures};
use ts_procedures::{ProcedureError, ProceduresEngine};
use ts_project::{ProjectError, ProjectFile, build_engine, build_suite, load_project};

#[derive(Parser)]
#[command(name = "ts-cli")]
#[command(about = "Topside CLI - plumbing network and procedure simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a project file and report network errors
    Validate {
        /// Path to the project YAML file
        project_path: PathBuf,
    },
    /// Solve the network to steady state
    Solve {
        /// Path to the project YAML file
        project_path: PathBuf,
        /// Give up after this much simulated time (seconds)
        #[arg(long)]
        max_time_s: Option<f64>,
        /// Record a sample every this many seconds
        #[arg(long)]
        sample_s: Option<f64>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Walk the project's procedure suite
    Run {
        /// Path to the project YAML file
        project_path: PathBuf,
        /// Simulated time between procedure checks (seconds)
        #[arg(long)]
        dt_s: f64,
        /// Stop after this many checks
        #[arg(long, default_value_t = 10_000)]
        max_steps: usize,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Procedure(#[from] ProcedureError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Project has {count} network errors")]
    InvalidNetwork { count: usize },

    #[error("Project has no procedure suite")]
    NoSuite,
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Solve {
            project_path,
            max_time_s,
            sample_s,
            json,
        } => cmd_solve(&project_path, max_time_s, sample_s, json),
        Commands::Run {
            project_path,
            dt_s,
            max_steps,
        } => cmd_run(&project_path, dt_s, max_steps),
    }
}

fn cmd_validate(project_path: &Path) -> CliResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = load_project(project_path)?;
    let engine = build_engine(&project)?;
    for error in engine.errors() {
        println!("  {error}");
    }
    if !engine.is_valid() {
        return Err(CliError::InvalidNetwork {
            count: engine.errors().len(),
        });
    }
    build_suite(&project)?;
    println!("✓ Project is valid");
    Ok(())
}

fn cmd_solve(
    project_path: &Path,
    max_time_s: Option<f64>,
    sample_s: Option<f64>,
    json: bool,
) -> CliResult<()> {
    let project = load_project(project_path)?;
    let mut engine = valid_engine(&project)?;
    let max_time = max_time_s
        .map(|s| micros_from_secs(s, "max_time_s"))
        .transpose()?;

    match sample_s {
        Some(sample_s) => {
            let resolution = micros_from_secs(sample_s, "sample_s")?;
            let samples = engine.solve_sampled(max_time, resolution)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&samples)?);
            } else {
                for sample in &samples {
                    println!("t = {:.6} s", secs_from_micros(sample.time));
                    print_pressures(&sample.pressures);
                }
            }
        }
        None => {
            let pressures = engine.solve(max_time)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
            } else {
                println!("t = {:.6} s", secs_from_micros(engine.time()));
                print_pressures(&pressures);
            }
        }
    }
    Ok(())
}

fn cmd_run(project_path: &Path, dt_s: f64, max_steps: usize) -> CliResult<()> {
    let dt = micros_from_secs(dt_s, "dt_s")?;
    let project = load_project(project_path)?;
    let engine = valid_engine(&project)?;
    let suite = build_suite(&project)?.ok_or(CliError::NoSuite)?;
    let mut proc_eng = ProceduresEngine::new(engine, suite);

    for _ in 0..max_steps {
        let depth = proc_eng.stack_depth();
        proc_eng.next_step()?;
        if proc_eng.stack_depth() != depth {
            let step = proc_eng.current_step()?;
            println!(
                "[{:>10.3} s] {}.{} ({}) {:?}",
                secs_from_micros(proc_eng.plumbing().time()),
                proc_eng.current_procedure(),
                step.step_id,
                step.operator,
                step.action
            );
        }
        if proc_eng.current_conditions().is_empty() {
            info!(step = proc_eng.current_step_id(), "reached a step with no way out");
            break;
        }
        proc_eng.step_time(dt)?;
    }

    println!("t = {:.6} s", secs_from_micros(proc_eng.plumbing().time()));
    print_pressures(&proc_eng.plumbing().current_pressures());
    Ok(())
}

fn valid_engine(project: &ProjectFile) -> CliResult<PlumbingEngine> {
    let engine = build_engine(project)?;
    if !engine.is_valid() {
        for error in engine.errors() {
            eprintln!("  {error}");
        }
        return Err(CliError::InvalidNetwork {
            count: engine.errors().len(),
        });
    }
    Ok(engine)
}

fn print_pressures(pressures: &Pressures) {
    for (node, pressure) in pressures {
        println!("  {node:<20} {pressure:>12.4}");
    }
}
