//! TrustHub migration CLI entrypoint.
//!
//! This is the main entry point for the `trusthub-migrate` command-line tool.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trust_cli::cli::{Cli, Commands};
use trust_cli::commands::{MigrateCommand, RollbackCommand, StatusCommand};
use trust_cli::output::OutputFormat;
use trust_cli::{CliError, Fixtures, MigrationRunner};
use trust_store::MemoryStore;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    // Only migrate reads fixtures; a bad --fixtures path must not break status.
    let fixtures = match cli.command {
        Commands::Migrate => Fixtures::load(cli.fixtures.as_deref())?,
        Commands::Rollback(_) | Commands::Status => Fixtures::default(),
    };
    let store = Arc::new(MemoryStore::open(&cli.data_dir));
    let runner = MigrationRunner::new(store, fixtures);

    match &cli.command {
        Commands::Migrate => {
            let cmd = MigrateCommand::new(&runner);
            cmd.execute(&mut stdout, &format).await?;
        }
        Commands::Rollback(args) => {
            let cmd = RollbackCommand::new(&runner, cli.is_production());
            cmd.execute(&mut stdout, &format, args).await?;
        }
        Commands::Status => {
            let cmd = StatusCommand::new(&runner);
            cmd.execute(&mut stdout, &format).await?;
        }
    }

    Ok(())
}
