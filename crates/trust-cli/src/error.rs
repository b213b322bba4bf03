//! CLI error types.

use std::fmt;

use crate::migration::MigrationError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Migration step, fixture or store failure.
    Migration(MigrationError),
    /// The migration finished but reported failure.
    Failed(String),
    /// The command is not allowed in this environment.
    Refused(String),
    /// Output formatting error.
    Format(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Migration(e) => write!(f, "migration error: {e}"),
            Self::Failed(msg) => write!(f, "migration failed: {msg}"),
            Self::Refused(msg) => write!(f, "refused: {msg}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Migration(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<MigrationError> for CliError {
    fn from(err: MigrationError) -> Self {
        Self::Migration(err)
    }
}
