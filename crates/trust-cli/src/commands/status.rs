//! Status command implementation.

use std::io::Write;

use trust_store::DocumentStore;

use crate::error::CliError;
use crate::migration::{MigrationRunner, MigrationStatus};
use crate::output::{OutputFormat, TableDisplay, write_heading};

/// Handler for the status command.
pub struct StatusCommand<'a, S> {
    runner: &'a MigrationRunner<S>,
}

impl<'a, S: DocumentStore> StatusCommand<'a, S> {
    /// Creates a new status command handler.
    #[must_use]
    pub fn new(runner: &'a MigrationRunner<S>) -> Self {
        Self { runner }
    }

    /// Executes the status command.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    pub async fn execute<W: Write>(&self, out: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let status = self.runner.status().await?;
        format.write(out, &status)?;
        Ok(())
    }
}

impl TableDisplay for MigrationStatus {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        write_heading(writer, "Migration Status")?;
        writeln!(writer, "Store health:     {}", self.store_health)?;
        writeln!(writer)?;
        writeln!(writer, "Records            TOTAL  MIGRATED")?;
        writeln!(writer, "  Users        {:>9} {:>9}", self.users, self.migrated_users)?;
        writeln!(writer, "  Businesses   {:>9} {:>9}", self.businesses, self.migrated_businesses)?;
        writeln!(writer, "  Reviews      {:>9} {:>9}", self.reviews, self.migrated_reviews)?;
        writeln!(writer, "  Categories   {:>9}", self.categories)?;
        writeln!(writer)?;
        match self.last_migration {
            Some(at) => writeln!(writer, "Last migration:   {}", at.to_rfc3339())?,
            None => writeln!(writer, "Last migration:   never")?,
        }
        Ok(())
    }
}
