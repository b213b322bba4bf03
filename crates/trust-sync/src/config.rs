//! Reconciliation and health-monitor settings.

use crate::operation::Priority;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Queue priority assigned to each ledger event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPriorities {
    /// A review was anchored.
    pub review_submitted: Priority,
    /// A review was attested.
    pub review_verified: Priority,
    /// Tokens were minted.
    pub token_mint: Priority,
    /// Tokens moved between wallets.
    pub token_transfer: Priority,
}

impl Default for EventPriorities {
    fn default() -> Self {
        Self {
            review_submitted: Priority::High,
            review_verified: Priority::Medium,
            token_mint: Priority::Medium,
            token_transfer: Priority::Low,
        }
    }
}

/// Settings for [`crate::ReconciliationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Time between queue ticks; one operation is processed per tick.
    pub tick_interval: Duration,
    /// Priority per ledger event type.
    pub priorities: EventPriorities,
}

impl SyncConfig {
    /// Set the tick interval.
    #[must_use]
    pub const fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the event priorities.
    #[must_use]
    pub const fn with_priorities(mut self, priorities: EventPriorities) -> Self {
        self.priorities = priorities;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            priorities: EventPriorities::default(),
        }
    }
}

/// Settings for [`crate::HealthMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    /// Time between heartbeats.
    pub heartbeat_interval: Duration,
    /// Time between reconnect attempts after a failed heartbeat.
    pub reconnect_interval: Duration,
    /// Reconnect attempts before giving up until the next heartbeat.
    pub max_reconnect_attempts: u32,
}

impl HealthConfig {
    /// Set the heartbeat interval.
    #[must_use]
    pub const fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the reconnect interval.
    #[must_use]
    pub const fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Set the reconnect attempt cap.
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            reconnect_interval: Duration::from_secs(1),
            max_reconnect_attempts: 5,
        }
    }
}
