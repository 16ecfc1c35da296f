use anyhow::Result;
use clap::{Parser, Subcommand};

use sentinel_infrastructure::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "aml-sentinel")]
#[command(about = "Incremental AML velocity detection", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Run the change monitor and HTTP API until interrupted (default)
    Serve,
    /// Run a single MANUAL pass and print its result
    RunOnce,
    /// Print the stored checkpoint
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref()).await?;
    let _log_guard = sentinel_bootstrap::logging::init(&config.log_settings())?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => sentinel_bootstrap::run_standalone(config).await,
        Command::RunOnce => sentinel_bootstrap::run_once(config).await,
        Command::Status => sentinel_bootstrap::print_status(config).await,
    }
}
