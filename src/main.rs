use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use p2d_rs::config::CellConfig;
use p2d_rs::models::p2d::{P2dCell, Simulation, Step, StepSolution};
use p2d_rs::numerics::events::{Direction, Limit, Quantity};
use p2d_rs::physics::control::ControlMode;
use p2d_rs::processing::csv_writer;
use p2d_rs::processing::summary::BuildSummary;
use p2d_rs::processing::verification::check_step;

/// Pseudo-2D lithium-ion cell simulator
#[derive(Parser)]
#[command(name = "p2d")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pseudo-2D lithium-ion cell simulator", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Constant-current step to a voltage limit, then rest
    Run(RunArgs),
    /// Build the cell and print its layout
    Info(InfoArgs),
}

#[derive(Args)]
struct RunArgs {
    /// TOML cell configuration, the reference cell when omitted
    config: Option<PathBuf>,
    /// Applied C-rate, negative to discharge
    #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
    c_rate: f64,
    /// Voltage limit that ends the step [V]
    #[arg(long)]
    cutoff: Option<f64>,
    /// Rest after the current step [s]
    #[arg(long, default_value_t = 600.0)]
    rest: f64,
    /// Saved points per step
    #[arg(long, default_value_t = 200)]
    points: usize,
    #[arg(short, long, default_value = "output/p2d")]
    output: PathBuf,
}

#[derive(Args)]
struct InfoArgs {
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Info(args) => {
            let cell = build_cell(args.config.as_deref())?;
            BuildSummary::from_cell(&cell).print_to_console();
            Ok(())
        }
    }
}

fn build_cell(path: Option<&Path>) -> anyhow::Result<P2dCell> {
    let config = match path {
        Some(path) => CellConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CellConfig::default(),
    };
    Ok(P2dCell::build(&config)?)
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let cell = build_cell(args.config.as_deref())?;
    let mut summary = BuildSummary::from_cell(&cell);

    anyhow::ensure!(args.c_rate != 0.0, "--c-rate must be nonzero");
    let discharge = args.c_rate < 0.0;
    let cutoff = args.cutoff.unwrap_or(if discharge { 3.0 } else { 4.2 });
    let direction = if discharge {
        Direction::Decreasing
    } else {
        Direction::Increasing
    };

    let steps = [
        Step::new(ControlMode::c_rate(args.c_rate), 1.2 * 3600.0 / args.c_rate.abs())
            .points(args.points)
            .limit(Limit::new(Quantity::VoltageV, cutoff).direction(direction)),
        Step::rest(args.rest).points(args.points),
    ];

    let mut sim = Simulation::new(&cell);
    let solutions = sim.run_steps(&steps);

    for (step, solution) in steps.iter().zip(&solutions) {
        report_step(&cell, step, solution);
    }

    csv_writer::write_steps(args.output.join("steps.csv"), &solutions)
        .context("writing steps.csv")?;
    if let Some((y, _)) = solutions.last().and_then(StepSolution::final_state) {
        csv_writer::write_xy(
            args.output.join("c_e.csv"),
            "x_m",
            "c_e_kmol_m3",
            &cell.x_mesh.centers,
            &cell.ce_idx.iter().map(|&k| y[k]).collect::<Vec<_>>(),
        )
        .context("writing c_e.csv")?;
    }

    summary.add_steps(&solutions);
    summary
        .write_to_file(args.output.join("summary.txt"))
        .context("writing summary.txt")?;
    summary.print_to_console();
    info!(output = %args.output.display(), "results written");
    Ok(())
}

fn report_step(cell: &P2dCell, step: &Step, solution: &StepSolution) {
    if !solution.success {
        warn!(message = %solution.message, "step failed");
        return;
    }
    let assembler = cell
        .assembler(step.mode.clone())
        .with_offset(solution.t_offset);
    let balance = check_step(&assembler, solution);
    info!(
        on_event = solution.on_event,
        reaction_error = balance.reaction_error,
        electrolyte_drift = balance.electrolyte_drift,
        lithium_drift = balance.lithium_drift,
        "balances"
    );
}
