//! Command implementations.
//!
//! Each command borrows the [`MigrationRunner`](crate::migration::MigrationRunner)
//! built by `main` and writes its result through an
//! [`OutputFormat`](crate::output::OutputFormat).

mod migrate;
mod rollback;
mod status;

pub use migrate::MigrateCommand;
pub use rollback::{ROLLBACK_CONFIRM_HINT, RollbackCommand, RollbackResponse};
pub use status::StatusCommand;
