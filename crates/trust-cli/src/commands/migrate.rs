//! Migrate command implementation.

use std::io::Write;

use trust_store::DocumentStore;

use crate::error::CliError;
use crate::migration::{KindStats, LogLevel, MigrationReport, MigrationRunner};
use crate::output::{OutputFormat, TableDisplay, write_heading};

/// Handler for the migrate command.
pub struct MigrateCommand<'a, S> {
    runner: &'a MigrationRunner<S>,
}

impl<'a, S: DocumentStore> MigrateCommand<'a, S> {
    /// Creates a new migrate command handler.
    #[must_use]
    pub fn new(runner: &'a MigrationRunner<S>) -> Self {
        Self { runner }
    }

    /// Executes the migrate command.
    ///
    /// The report is written even when the run fails.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable or the run fails.
    pub async fn execute<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        self.runner.health_check().await?;

        let report = self.runner.run().await;
        format.write(out, &report)?;

        match report.error {
            None => Ok(()),
            Some(error) => Err(CliError::Failed(error)),
        }
    }
}

fn write_kind<W: Write>(writer: &mut W, name: &str, stats: &KindStats) -> Result<(), CliError> {
    writeln!(
        writer,
        "  {name:<12} {:>7} {:>7} {:>7}",
        stats.created, stats.updated, stats.failed
    )?;
    Ok(())
}

impl TableDisplay for MigrationReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        write_heading(writer, "Migration Results")?;
        writeln!(writer)?;

        if self.success {
            writeln!(writer, "✓ Migration completed in {} ms", self.execution_ms)?;
        } else {
            writeln!(
                writer,
                "✗ Migration failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            )?;
        }
        writeln!(writer)?;

        writeln!(writer, "  {:<12} {:>7} {:>7} {:>7}", "KIND", "CREATED", "UPDATED", "FAILED")?;
        write_kind(writer, "categories", &self.categories)?;
        write_kind(writer, "users", &self.users)?;
        write_kind(writer, "businesses", &self.businesses)?;
        write_kind(writer, "reviews", &self.reviews)?;

        let errors: Vec<&String> = [&self.categories, &self.users, &self.businesses, &self.reviews]
            .into_iter()
            .flat_map(|stats| &stats.errors)
            .collect();
        if !errors.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Errors")?;
            for error in errors {
                writeln!(writer, "  - {error}")?;
            }
        }

        writeln!(writer)?;
        writeln!(writer, "Log")?;
        for entry in &self.log {
            let marker = match entry.level {
                LogLevel::Info => "INFO ",
                LogLevel::Warn => "WARN ",
                LogLevel::Error => "ERROR",
            };
            writeln!(
                writer,
                "  {} {marker} {}",
                entry.timestamp.format("%H:%M:%S"),
                entry.message
            )?;
        }
        Ok(())
    }
}
