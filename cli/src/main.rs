mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{pipeline, proxy, stage};
use roadrisk::Stage;
use tracing_subscriber::EnvFilter;

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Run(args) => pipeline::run(&cli, args),
        Commands::Fuse(args) => stage::fuse(&cli, args),
        Commands::Score(args) => stage::run(&cli, Stage::Score, args),
        Commands::Hotspots(args) => stage::run(&cli, Stage::Hotspot, args),
        Commands::Proxy(args) => proxy::run(&cli, args),
    }
}

/// `RUST_LOG` wins; otherwise `-v` raises the level from info to debug to trace.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> { run() }
