mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flowalign", about = "Flow-cell fluorescence image alignment")]
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
    /// Align the fiducial channel of every acquisition
    Align(commands::align::AlignArgs),
    /// Align a protein channel using the fiducial transforms
    Channel(commands::channel::ChannelArgs),
    /// Show experiment metadata and alignment progress
    Info(commands::info::InfoArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Align(args) => commands::align::run(args),
        Commands::Channel(args) => commands::channel::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
