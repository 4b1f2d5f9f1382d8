mod commands;
mod config;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "peakscan", about = "B-scan peak detection on recorded acquisition data")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an acquisition dump through the peak detector
    Run(commands::run::RunArgs),
    /// Convert one raw frame to an 8-bit PNG
    Convert(commands::convert::ConvertArgs),
    /// Average one raw frame over a ROI and locate its peak
    Peak(commands::peak::PeakArgs),
    /// Print or save the default run config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Convert(args) => commands::convert::run(args),
        Commands::Peak(args) => commands::peak::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
