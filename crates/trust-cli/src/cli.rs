//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// TrustHub migration tool - seeds the document store with fixture data.
#[derive(Parser, Debug, Clone)]
#[command(name = "trusthub-migrate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the document store snapshot.
    #[arg(short, long, global = true, env = "TRUSTHUB_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Deployment environment. Rollback is refused in `production`.
    #[arg(short, long, global = true, env = "TRUSTHUB_ENV", default_value = "development")]
    pub environment: String,

    /// Output format.
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Fixture file to migrate instead of the embedded seed data.
    #[arg(long, global = true, env = "TRUSTHUB_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Whether the configured environment is production.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the full migration.
    Migrate,

    /// Delete every migrated record.
    Rollback(RollbackArgs),

    /// Show store health and migrated record counts.
    Status,
}

/// Arguments for the rollback command.
#[derive(Args, Debug, Clone, Default)]
pub struct RollbackArgs {
    /// Actually delete. Without it the command only prints instructions.
    #[arg(long)]
    pub confirm: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["trusthub-migrate", "status"]);
        assert_eq!(cli.format, Format::Table);
        assert_eq!(cli.data_dir, PathBuf::from("./data"));
        assert!(cli.fixtures.is_none());
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn rollback_confirm_flag() {
        let cli = Cli::parse_from(["trusthub-migrate", "rollback", "--confirm"]);
        match cli.command {
            Commands::Rollback(args) => assert!(args.confirm),
            other => panic!("expected rollback, got {other:?}"),
        }

        let cli = Cli::parse_from(["trusthub-migrate", "rollback"]);
        assert!(matches!(cli.command, Commands::Rollback(RollbackArgs { confirm: false })));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "trusthub-migrate",
            "migrate",
            "--format",
            "json",
            "--data-dir",
            "/tmp/trusthub",
        ]);
        assert_eq!(cli.format, Format::Json);
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/trusthub"));
    }

    #[test]
    fn production_is_case_insensitive() {
        let cli = Cli::parse_from(["trusthub-migrate", "-e", "Production", "status"]);
        assert!(cli.is_production());

        let cli = Cli::parse_from(["trusthub-migrate", "-e", "staging", "status"]);
        assert!(!cli.is_production());
    }
}
