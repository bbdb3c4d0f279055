use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use yard_engine::batch::{self, BatchInput, Operation};
use yard_engine::config::EngineConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Command {
    /// Deduplicate placements and recompute boat statuses
    Reconcile,
    /// Re-run warehouse packing / dock distribution
    Layout,
    /// Pull placements back inside their storage unit
    Clamp,
    /// Toggle placement rotations
    Rotate,
    /// Drop restriction zones that constrain nothing
    PruneZones,
    /// Report collisions and out-of-bounds placements
    Audit,
}

#[derive(Parser)]
#[command(version, about = "Batch transforms over boat yard placement records", long_about = None)]
struct Cli {
    #[arg(value_enum)]
    command: Command,

    /// Input records as JSON (stdin when omitted)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Engine config JSON, replaces the one embedded in the input
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Restrict layout/rotate to one storage unit
    #[arg(short, long, value_name = "ID")]
    unit: Option<String>,

    /// Rotation delta in degrees for `rotate`
    #[arg(short, long, value_name = "DEG", allow_negative_numbers = true)]
    delta: Option<f64>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let text = match &cli.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {path:?}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read input from stdin")?;
            buf
        }
    };
    let mut input: BatchInput =
        serde_json::from_str(&text).context("Failed to parse batch input")?;
    if let Some(path) = &cli.config {
        input.config = EngineConfig::load(path)
            .with_context(|| format!("Failed to load config: {path:?}"))?;
    }

    let op = match cli.command {
        Command::Reconcile => Operation::Reconcile,
        Command::Layout => Operation::Layout { unit: cli.unit },
        Command::Clamp => Operation::Clamp,
        Command::Rotate => Operation::Rotate {
            unit: cli.unit,
            delta: cli.delta,
        },
        Command::PruneZones => Operation::PruneZones,
        Command::Audit => Operation::Audit,
    };

    let output = batch::run(&op, &input).with_context(|| format!("{op:?} failed"))?;
    let json = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{json}");
    Ok(())
}
