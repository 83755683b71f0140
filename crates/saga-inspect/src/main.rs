mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use saga_log::JsonLinesLogStore;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::commands::Commands;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "saga-inspect")]
#[command(about = "Inspect saga executions recorded in a JSON Lines log", long_about = None)]
struct Cli {
    /// JSON Lines file the saga events were appended to
    #[arg(long = "log", short = 'l', global = true, env = "SAGA_LOG_FILE")]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = cli
        .log
        .ok_or(CliError::MissingLogFile)
        .and_then(|path| cli.command.execute(&JsonLinesLogStore::new(path)));

    if let Err(e) = result {
        print_error(&e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SAGA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn print_error(error: &CliError) {
    eprintln!("error: {error}");

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("caused by: {cause}");
        source = std::error::Error::source(cause);
    }
}
