//! Server configuration.
//!
//! Loaded from a TOML file where every section and key is optional:
//!
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0:8080"
//! environment = "production"
//! data_dir = "/var/lib/trusthub"
//!
//! [session]
//! secret = "at-least-thirty-two-bytes-of-secret-material"
//!
//! [identity]
//! app_id = "app_staging_123"
//!
//! [rewards]
//! base_review_reward = 10
//! ```

use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use trust_core::RewardSchedule;
use trust_sync::{EventPriorities, HealthConfig, SyncConfig};
use trust_token::{LedgerConfig, TRANSACTION_LOG_CAPACITY};

/// Shortest accepted session secret, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Address to bind.
    pub bind_addr: SocketAddr,
    /// Deployment environment name.
    pub environment: String,
    /// Directory for persisted state; in-memory only when unset.
    pub data_dir: Option<PathBuf>,
    /// Allowed CORS origins; empty allows any.
    pub cors_origins: Vec<String>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            environment: "development".to_string(),
            data_dir: None,
            cors_origins: Vec::new(),
        }
    }
}

/// Session token settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// HS256 signing secret.
    pub secret: String,
    /// `iss` claim.
    pub issuer: String,
    /// Token lifetime in days.
    pub lifetime_days: u32,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "trusthub".to_string(),
            lifetime_days: 7,
        }
    }
}

/// Identity proof verification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySection {
    /// Verification endpoint.
    pub verify_url: String,
    /// Registered application ID.
    pub app_id: String,
    /// Action the proofs are scoped to.
    pub action: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            verify_url: "https://developer.worldcoin.org/api/v1/verify".to_string(),
            app_id: String::new(),
            action: "verify-reviewer".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Token ledger timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// Award confirmation wait in milliseconds.
    pub award_delay_ms: u64,
    /// Spend confirmation wait in milliseconds.
    pub spend_delay_ms: u64,
    /// Transactions kept per wallet.
    pub log_capacity: usize,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            award_delay_ms: 1_000,
            spend_delay_ms: 2_000,
            log_capacity: TRANSACTION_LOG_CAPACITY,
        }
    }
}

impl LedgerSection {
    /// As a ledger config.
    #[must_use]
    pub fn to_config(&self) -> LedgerConfig {
        LedgerConfig::default()
            .with_award_delay(Duration::from_millis(self.award_delay_ms))
            .with_spend_delay(Duration::from_millis(self.spend_delay_ms))
            .with_log_capacity(self.log_capacity)
    }
}

/// Reconciliation queue settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Queue tick in milliseconds.
    pub tick_interval_ms: u64,
    /// Priority per ledger event type.
    pub priorities: EventPriorities,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            priorities: EventPriorities::default(),
        }
    }
}

impl SyncSection {
    /// As a sync config.
    #[must_use]
    pub fn to_config(&self) -> SyncConfig {
        SyncConfig::default()
            .with_tick_interval(Duration::from_millis(self.tick_interval_ms))
            .with_priorities(self.priorities)
    }
}

/// Store health monitor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSection {
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Reconnect interval in milliseconds.
    pub reconnect_interval_ms: u64,
    /// Reconnect attempt cap.
    pub max_reconnect_attempts: u32,
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            reconnect_interval_ms: 1_000,
            max_reconnect_attempts: 5,
        }
    }
}

impl HealthSection {
    /// As a health monitor config.
    #[must_use]
    pub fn to_config(&self) -> HealthConfig {
        HealthConfig::default()
            .with_heartbeat_interval(Duration::from_secs(self.heartbeat_interval_secs))
            .with_reconnect_interval(Duration::from_millis(self.reconnect_interval_ms))
            .with_max_reconnect_attempts(self.max_reconnect_attempts)
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listener.
    pub server: HttpSection,
    /// Session tokens.
    pub session: SessionSection,
    /// Identity verification.
    pub identity: IdentitySection,
    /// Token ledger.
    pub ledger: LedgerSection,
    /// Reward amounts.
    pub rewards: RewardSchedule,
    /// Reconciliation queue.
    pub sync: SyncSection,
    /// Store health monitor.
    pub health: HealthSection,
}

impl ServerConfig {
    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the file cannot be read, parsed or
    /// validated.
    pub fn from_file(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file without validating it, so that command-line
    /// overrides can be applied first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the file cannot be read or parsed.
    pub fn read(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::config(format!("failed to read config file '{}': {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| GatewayError::config(format!("invalid TOML: {e}")))
    }

    /// Parse and validate TOML.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the TOML is invalid or fails
    /// validation.
    pub fn from_toml(content: &str) -> GatewayResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| GatewayError::config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the bind address.
    #[must_use]
    pub const fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.server.bind_addr = addr;
        self
    }

    /// Set the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.server.data_dir = Some(dir.into());
        self
    }

    /// Set the session secret.
    #[must_use]
    pub fn with_session_secret(mut self, secret: impl Into<String>) -> Self {
        self.session.secret = secret.into();
        self
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] describing the first violation.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.session.secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(GatewayError::config(format!(
                "session secret must be at least {MIN_SESSION_SECRET_LEN} bytes"
            )));
        }
        if self.session.lifetime_days == 0 {
            return Err(GatewayError::config("session lifetime must be at least one day"));
        }
        if self.identity.verify_url.is_empty() {
            return Err(GatewayError::config("identity verify_url cannot be empty"));
        }
        if self.sync.tick_interval_ms == 0 {
            return Err(GatewayError::config("sync tick interval must be positive"));
        }
        if self.health.heartbeat_interval_secs == 0 {
            return Err(GatewayError::config("heartbeat interval must be positive"));
        }
        if self.ledger.log_capacity == 0 {
            return Err(GatewayError::config("ledger log capacity must be positive"));
        }
        Ok(())
    }

    /// Whether this is a production deployment.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.server.environment.eq_ignore_ascii_case("production")
    }
}
