//! Rollback command implementation.
//!
//! Deletes migrated records. Refused outright in production; elsewhere it
//! only prints instructions unless `--confirm` is given.

use std::io::Write;

use serde::Serialize;
use tracing::warn;
use trust_store::DocumentStore;

use crate::cli::RollbackArgs;
use crate::error::CliError;
use crate::migration::{MigrationRunner, RollbackCounts};
use crate::output::{OutputFormat, TableDisplay, write_heading};

/// Printed when rollback runs without `--confirm`.
pub const ROLLBACK_CONFIRM_HINT: &str = "To confirm rollback, run: trusthub-migrate rollback --confirm";

/// Handler for the rollback command.
pub struct RollbackCommand<'a, S> {
    runner: &'a MigrationRunner<S>,
    production: bool,
}

impl<'a, S: DocumentStore> RollbackCommand<'a, S> {
    /// Creates a new rollback command handler.
    #[must_use]
    pub fn new(runner: &'a MigrationRunner<S>, production: bool) -> Self {
        Self { runner, production }
    }

    /// Executes the rollback command.
    ///
    /// # Errors
    ///
    /// Returns error in production or if a delete fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &RollbackArgs,
    ) -> Result<(), CliError> {
        if self.production {
            return Err(CliError::Refused(
                "rollback is not allowed in the production environment".into(),
            ));
        }

        let response = if args.confirm {
            warn!("rolling back migrated records");
            RollbackResponse::deleted(self.runner.rollback().await?)
        } else {
            RollbackResponse::unconfirmed()
        };

        format.write(out, &response)?;
        Ok(())
    }
}

// Output types

/// Rollback response.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackResponse {
    /// Whether records were deleted.
    pub confirmed: bool,
    /// Records deleted per collection.
    pub deleted: RollbackCounts,
    /// Response message.
    pub message: String,
}

impl RollbackResponse {
    fn unconfirmed() -> Self {
        Self {
            confirmed: false,
            deleted: RollbackCounts::default(),
            message: ROLLBACK_CONFIRM_HINT.to_string(),
        }
    }

    fn deleted(counts: RollbackCounts) -> Self {
        Self {
            confirmed: true,
            deleted: counts,
            message: format!(
                "Deleted {} reviews, {} businesses and {} users",
                counts.reviews, counts.businesses, counts.users
            ),
        }
    }
}

impl TableDisplay for RollbackResponse {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        write_heading(writer, "Rollback Results")?;
        writeln!(writer)?;

        if !self.confirmed {
            writeln!(writer, "⚠ Rollback not confirmed. No records were deleted.")?;
            writeln!(writer, "{}", self.message)?;
            return Ok(());
        }

        writeln!(writer, "✓ {}", self.message)?;
        writeln!(writer)?;
        writeln!(writer, "Reviews:      {}", self.deleted.reviews)?;
        writeln!(writer, "Businesses:   {}", self.deleted.businesses)?;
        writeln!(writer, "Users:        {}", self.deleted.users)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fixtures::Fixtures;
    use trust_store::MemoryStore;
    use trust_store::collections::REVIEWS;

    async fn migrated() -> MigrationRunner<MemoryStore> {
        let runner = MigrationRunner::new(
            Arc::new(MemoryStore::new()),
            Fixtures::embedded().expect("seed"),
        );
        assert!(runner.run().await.success);
        runner
    }

    async fn review_count(runner: &MigrationRunner<MemoryStore>) -> usize {
        runner.store().count(REVIEWS, None).await.expect("count")
    }

    #[tokio::test]
    async fn unconfirmed_rollback_deletes_nothing() {
        let runner = migrated().await;
        let mut out = Vec::new();
        RollbackCommand::new(&runner, false)
            .execute(&mut out, &OutputFormat::default(), &RollbackArgs { confirm: false })
            .await
            .expect("rollback");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains(ROLLBACK_CONFIRM_HINT));
        assert_eq!(review_count(&runner).await, 5);
    }

    #[tokio::test]
    async fn production_refuses_even_when_confirmed() {
        let runner = migrated().await;
        let mut out = Vec::new();
        let err = RollbackCommand::new(&runner, true)
            .execute(&mut out, &OutputFormat::default(), &RollbackArgs { confirm: true })
            .await
            .expect_err("should refuse");

        assert!(matches!(err, CliError::Refused(_)));
        assert!(out.is_empty());
        assert_eq!(review_count(&runner).await, 5);
    }

    #[tokio::test]
    async fn confirmed_rollback_deletes() {
        let runner = migrated().await;
        let mut out = Vec::new();
        RollbackCommand::new(&runner, false)
            .execute(&mut out, &OutputFormat::default(), &RollbackArgs { confirm: true })
            .await
            .expect("rollback");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Deleted 5 reviews, 3 businesses and 4 users"));
        assert_eq!(review_count(&runner).await, 0);
    }
}
