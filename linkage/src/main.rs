//! # Linkage Runtime
//!
//! Command-line entry point. `train` runs the training loop followed by a
//! short noise-free evaluation; `eval` replays a saved checkpoint; `config`
//! prints the default configuration as JSON.

mod app;
mod watcher;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "linkage")]
#[command(about = "Train a controller for a simulated N-link pendulum", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run training
    Train(TrainArgs),
    /// Evaluate a checkpoint without exploration or learning
    Eval(EvalArgs),
    /// Print the default configuration
    Config,
}

#[derive(clap::Args, Debug)]
pub struct TrainArgs {
    /// JSON configuration; defaults apply to every missing field
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// CSV of recorded joint angles used as target poses
    #[arg(long)]
    pub angles: Option<PathBuf>,
    #[arg(long)]
    pub run_id: Option<String>,
    /// Override the number of episodes
    #[arg(long)]
    pub episodes: Option<usize>,
    /// Checkpoint metadata file to continue from
    #[arg(long)]
    pub resume: Option<PathBuf>,
    /// Do not watch for a STOP file
    #[arg(long)]
    pub no_watch: bool,
}

#[derive(clap::Args, Debug)]
pub struct EvalArgs {
    /// Checkpoint metadata file to evaluate
    #[arg(long)]
    pub resume: PathBuf,
    /// JSON configuration the checkpoint was trained with
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// CSV of recorded joint angles used as target poses
    #[arg(long)]
    pub angles: Option<PathBuf>,
    /// Number of evaluation episodes; defaults to the configured count
    #[arg(long)]
    pub episodes: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Train(args) => app::train(&args),
        Command::Eval(args) => app::evaluate(&args),
        Command::Config => app::print_default_config(),
    }
}
