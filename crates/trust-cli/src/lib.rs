//! # trust-cli
//!
//! TrustHub migration tool.
//!
//! Provides commands for:
//! - Seeding the document store with fixture businesses, reviews and users
//! - Inspecting record counts and migration provenance
//! - Rolling back everything a migration wrote
//!
//! # Architecture
//!
//! The `trusthub-migrate` binary opens the same document store snapshot as
//! `trusthub-server` (under `--data-dir`) and drives a
//! [`MigrationRunner`] over it.
//!
//! ```text
//! ┌──────────────────┐               ┌──────────────────┐
//! │ trusthub-migrate │──────────────►│  document store  │
//! └──────────────────┘   snapshot    └──────────────────┘
//!          │                                  ▲
//!      fixtures                               │
//!   (seed.json)                       trusthub-server
//! ```
//!
//! | Command | Effect |
//! |---------|--------|
//! | `migrate` | categories, users, businesses, reviews, rollups, integrity check |
//! | `rollback [--confirm]` | deletes migrated records; refused in production |
//! | `status` | store health, record counts, migrated counts, last migration |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod fixtures;
pub mod migration;
pub mod output;

pub use cli::{Cli, Commands, Format, RollbackArgs};
pub use error::CliError;
pub use fixtures::Fixtures;
pub use migration::{MigrationError, MigrationReport, MigrationResult, MigrationRunner};
pub use output::OutputFormat;
