//! End-to-end integration tests for TrustHub.
//!
//! These tests exercise the crates together:
//! - Review submission, scoring and reward payment through the ledger
//! - Ledger events and store changes reconciled by the sync service
//! - The HTTP API served on a real socket
//! - Fixture migration feeding the API

#![cfg(test)]
