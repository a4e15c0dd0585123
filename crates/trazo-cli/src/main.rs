//! Trazo CLI - decode device captures and inspect configuration.

mod commands;
mod sinks;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "trazo")]
#[command(author, version, about = "Trazo telemetry stream CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a capture file (or stdin) through a configured protocol
    Decode(commands::decode::DecodeArgs),

    /// Stream synthetic demo data through the pipeline
    Demo(commands::demo::DemoArgs),

    /// Show the effective configuration profile
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode(args) => commands::decode::run(args),
        Commands::Demo(args) => commands::demo::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
