//! Request and response bodies for the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trust_core::{
    Badge, BusinessRecord, BusinessSort, Level, ReviewRecord, UserRecord, VerificationLevel,
};
use trust_sync::{ConnectionStatus, SyncStatus};
use trust_token::{ContextType, TokenBalance, TokenTransaction, WalletAddress};

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` when the store answers, `degraded` otherwise.
    pub status: String,
    /// Deployment environment.
    pub environment: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Store connection as seen by the heartbeat monitor.
    pub store: ConnectionStatus,
    /// Reconciliation service status.
    pub sync: SyncStatus,
}

/// Body of `POST /api/auth/verify-world-id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyWorldIdRequest {
    /// Zero-knowledge proof.
    pub proof: Option<String>,
    /// Unique-human nullifier.
    pub nullifier_hash: Option<String>,
    /// Merkle root.
    pub merkle_root: Option<String>,
    /// Proof action; defaults to the configured action.
    pub action: Option<String>,
    /// Signal; the wallet the proof is for.
    pub signal: Option<String>,
}

/// Response of `POST /api/auth/verify-world-id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyWorldIdResponse {
    /// Always `true`; failures are error responses.
    pub success: bool,
    /// Unique-human nullifier.
    pub nullifier_hash: String,
    /// Merkle root.
    pub merkle_root: String,
    /// Zero-knowledge proof.
    pub proof: String,
    /// Proof strength.
    pub verification_level: VerificationLevel,
    /// Verification time.
    pub verified_at: DateTime<Utc>,
    /// Existing user bound to the signal wallet.
    pub user_id: Option<String>,
}

/// Body of `POST /api/auth/wallet`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletAuthRequest {
    /// Wallet address.
    pub wallet_address: Option<String>,
    /// Base58 signature of `message`.
    pub signature: Option<String>,
    /// Signed message.
    pub message: Option<String>,
    /// Client-side identity claim; only the server-side cache is trusted.
    pub world_id_data: Option<serde_json::Value>,
}

/// Public user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    /// User ID.
    pub id: String,
    /// Wallet address.
    pub wallet_address: WalletAddress,
    /// Identity-verified.
    pub world_id_verified: bool,
    /// Display name.
    pub display_name: Option<String>,
    /// Reputation score.
    pub reputation_score: u32,
    /// Level tier.
    pub level: Level,
    /// Badge tier.
    pub badge: Badge,
    /// Published reviews.
    pub reviews_count: u32,
    /// Spendable TRH, read from the ledger store.
    pub trh_balance: u64,
    /// Identity verification time.
    pub verified_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created: Option<DateTime<Utc>>,
}

impl UserView {
    /// Build a view with the given live balance.
    #[must_use]
    pub fn new(user: UserRecord, trh_balance: u64) -> Self {
        Self {
            id: user.id,
            wallet_address: user.wallet_address,
            world_id_verified: user.world_id_verified,
            display_name: user.display_name,
            reputation_score: user.reputation_score,
            level: user.level,
            badge: user.badge,
            reviews_count: user.reviews_count,
            trh_balance,
            verified_at: user.verified_at,
            created: user.created,
        }
    }
}

/// Response of `POST /api/auth/wallet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletAuthResponse {
    /// Always `true`.
    pub success: bool,
    /// Bearer session token.
    pub token: String,
    /// The signed-in user.
    pub user: UserView,
}

/// Body of `POST /api/reviews`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReviewRequest {
    /// Reviewed business.
    pub business_id: String,
    /// Star rating.
    pub rating: u8,
    /// Optional headline.
    #[serde(default)]
    pub title: Option<String>,
    /// Body text.
    pub content: String,
    /// Photos or video attached.
    #[serde(default)]
    pub has_media: bool,
}

/// Body of `POST /api/reviews/{id}/votes`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VoteRequest {
    /// Helpful or not.
    pub helpful: bool,
}

/// Response of `POST /api/reviews/{id}/attest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestResponse {
    /// Attested review.
    pub review_id: String,
    /// Ledger transaction hash.
    pub tx_hash: String,
}

/// A business with its published reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessView {
    /// The business.
    pub business: BusinessRecord,
    /// Published reviews, oldest first.
    pub reviews: Vec<ReviewRecord>,
    /// Served from cache because the store is unavailable.
    pub stale: bool,
}

/// Body of `POST /api/businesses`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBusinessRequest {
    /// Display name.
    pub name: String,
    /// URL slug; derived from the name when absent.
    #[serde(default)]
    pub slug: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Website URL.
    #[serde(default)]
    pub website: Option<String>,
    /// Category name.
    #[serde(default)]
    pub category: String,
}

/// Query of `GET /api/businesses`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessQuery {
    /// Text to match.
    pub q: Option<String>,
    /// Extra filter expression, e.g. `verified=true`.
    pub filter: Option<String>,
    /// `rating`, `reviews` or `newest`.
    #[serde(default)]
    pub sort: BusinessSort,
    /// Maximum results.
    pub limit: Option<usize>,
}

/// Query of `GET /api/tokens/balance`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BalanceQuery {
    /// Transactions to return.
    pub limit: Option<usize>,
}

/// Response of `GET /api/tokens/balance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Wallet address.
    pub wallet: WalletAddress,
    /// Current balance.
    pub balance: TokenBalance,
    /// Newest transactions first.
    pub transactions: Vec<TokenTransaction>,
}

/// Body of `POST /api/tokens/spend`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpendRequest {
    /// Whole TRH to spend.
    pub amount: u64,
    /// Description for the transaction log.
    #[serde(default)]
    pub description: Option<String>,
    /// What the spend pays for.
    #[serde(default)]
    pub context_type: Option<ContextType>,
    /// Related entity.
    #[serde(default)]
    pub context_id: Option<String>,
}

/// Response of `POST /api/tokens/spend`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendResponse {
    /// The confirmed spend.
    pub transaction: TokenTransaction,
    /// Balance after the spend.
    pub balance: TokenBalance,
}
