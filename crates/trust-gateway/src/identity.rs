//! Identity proof verification.
//!
//! [`ProofVerifier`] is the seam to the external proof service. The server
//! uses [`RemoteProofVerifier`]; tests and local runs use
//! [`StaticProofVerifier`].

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use trust_core::VerificationLevel;

use crate::config::IdentitySection;
use crate::error::{GatewayError, GatewayResult};

/// Identity proof as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    /// Zero-knowledge proof.
    pub proof: String,
    /// Unique-human nullifier.
    pub nullifier_hash: String,
    /// Merkle root of the identity set.
    pub merkle_root: String,
    /// Action the proof is scoped to.
    pub action: String,
    /// Signal bound into the proof; the wallet address.
    pub signal: String,
}

/// Verdict of the proof service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofOutcome {
    /// Proof accepted.
    Verified {
        /// Proof strength.
        level: VerificationLevel,
    },
    /// Proof rejected by the service.
    Rejected {
        /// Reason given by the service.
        detail: String,
    },
}

/// Checks identity proofs.
pub trait ProofVerifier: Send + Sync + 'static {
    /// Verify `request`.
    ///
    /// A rejection is an [`ProofOutcome::Rejected`]; errors are reserved for
    /// an unreachable or failing service.
    fn verify(
        &self,
        request: &ProofRequest,
    ) -> impl Future<Output = GatewayResult<ProofOutcome>> + Send;
}

#[derive(Debug, Serialize)]
struct VerifyBody<'a> {
    nullifier_hash: &'a str,
    merkle_root: &'a str,
    proof: &'a str,
    action: &'a str,
    signal: &'a str,
    app_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct VerifyReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    verification_level: Option<VerificationLevel>,
}

/// Verifier backed by the hosted proof service.
pub struct RemoteProofVerifier {
    client: reqwest::Client,
    verify_url: String,
    app_id: String,
}

impl RemoteProofVerifier {
    /// Create a verifier from the identity config section.
    #[must_use]
    pub fn new(config: &IdentitySection) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            verify_url: config.verify_url.clone(),
            app_id: config.app_id.clone(),
        }
    }
}

impl ProofVerifier for RemoteProofVerifier {
    async fn verify(&self, request: &ProofRequest) -> GatewayResult<ProofOutcome> {
        let body = VerifyBody {
            nullifier_hash: &request.nullifier_hash,
            merkle_root: &request.merkle_root,
            proof: &request.proof,
            action: &request.action,
            signal: &request.signal,
            app_id: &self.app_id,
        };

        let response = self
            .client
            .post(&self.verify_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(format!("identity service unreachable: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            warn!(status = %status, "identity service failed");
            return Err(GatewayError::upstream(format!(
                "identity service returned {status}"
            )));
        }
        let reply: VerifyReply = response.json().await.unwrap_or_default();
        debug!(status = %status, success = reply.success, "identity service replied");

        if status.is_success() && reply.success {
            return Ok(ProofOutcome::Verified {
                level: reply.verification_level.unwrap_or_default(),
            });
        }
        Ok(ProofOutcome::Rejected {
            detail: reply
                .detail
                .unwrap_or_else(|| "Verification not approved".to_string()),
        })
    }
}

/// Verifier with a fixed verdict.
#[derive(Debug, Default)]
pub struct StaticProofVerifier {
    rejection: Mutex<Option<String>>,
    level: VerificationLevel,
}

impl StaticProofVerifier {
    /// Accept every proof at orb level.
    #[must_use]
    pub fn accepting() -> Self {
        Self::default()
    }

    /// Reject every proof with `detail`.
    #[must_use]
    pub fn rejecting(detail: impl Into<String>) -> Self {
        Self {
            rejection: Mutex::new(Some(detail.into())),
            level: VerificationLevel::default(),
        }
    }

    /// Switch between accepting and rejecting.
    pub fn set_rejection(&self, detail: Option<String>) {
        *self.rejection.lock() = detail;
    }
}

impl ProofVerifier for StaticProofVerifier {
    async fn verify(&self, _request: &ProofRequest) -> GatewayResult<ProofOutcome> {
        let rejection = self.rejection.lock().clone();
        Ok(match rejection {
            Some(detail) => ProofOutcome::Rejected { detail },
            None => ProofOutcome::Verified { level: self.level },
        })
    }
}
