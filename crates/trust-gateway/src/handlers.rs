//! HTTP request handlers for the TrustHub API.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use tracing::{debug, error, info, warn};
use trust_core::{
    BusinessRecord, BusinessSearch, DEFAULT_SEARCH_LIMIT, NewBusiness, NewReview, ReviewRecord,
    SubmittedReview, VerificationRecord,
};
use trust_store::DocumentStore;
use trust_token::{Amount, ContextType, TRANSACTION_LOG_CAPACITY, WalletAddress};

use crate::error::{GatewayError, GatewayResult};
use crate::identity::{ProofOutcome, ProofRequest, ProofVerifier};
use crate::session::bearer_token;
use crate::state::AppState;
use crate::types::{
    AttestResponse, BalanceQuery, BalanceResponse, BusinessQuery, BusinessView,
    CreateBusinessRequest, HealthResponse, SpendRequest, SpendResponse, SubmitReviewRequest, UserView, VerifyWorldIdRequest,
    VerifyWorldIdResponse, VoteRequest, WalletAuthRequest, WalletAuthResponse,
};

/// Transactions returned by the balance endpoint when no limit is given.
pub const DEFAULT_TRANSACTION_LIMIT: usize = 20;

/// Wallet of an authenticated request, taken from its bearer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session(pub WalletAddress);

impl<V: ProofVerifier> FromRequestParts<Arc<AppState<V>>> for Session {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<V>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| GatewayError::authentication("missing authorization header"))?
            .to_str()
            .map_err(|_| GatewayError::authentication("malformed authorization header"))?;
        let wallet = state.sessions().verify(bearer_token(header)?)?;
        Ok(Self(wallet))
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Handle GET /api/health - service, store and sync status.
pub async fn health<V: ProofVerifier>(
    State(state): State<Arc<AppState<V>>>,
) -> Json<HealthResponse> {
    let status = match state.store().health_check().await {
        Ok(()) => "ok",
        Err(e) => {
            warn!(error = %e, "store health check failed");
            "degraded"
        }
    };
    Json(HealthResponse {
        status: status.to_string(),
        environment: state.config().server.environment.clone(),
        uptime_secs: state.uptime_secs(),
        store: state.health().status(),
        sync: state.sync().status(),
    })
}

/// Handle POST /api/auth/verify-world-id - check an identity proof.
///
/// A verified proof whose signal is a wallet address is cached for that
/// wallet. If the wallet already has a user, the user is marked verified and
/// the one-time verification bonus is paid.
pub async fn verify_world_id<V: ProofVerifier>(
    State(state): State<Arc<AppState<V>>>,
    payload: Result<Json<VerifyWorldIdRequest>, JsonRejection>,
) -> GatewayResult<Json<VerifyWorldIdResponse>> {
    let Json(body) = payload?;
    let (Some(proof), Some(nullifier_hash), Some(merkle_root)) = (
        present(body.proof),
        present(body.nullifier_hash),
        present(body.merkle_root),
    ) else {
        return Err(GatewayError::validation("Missing required verification fields"));
    };

    let request = ProofRequest {
        proof,
        nullifier_hash,
        merkle_root,
        action: present(body.action).unwrap_or_else(|| state.config().identity.action.clone()),
        signal: body.signal.unwrap_or_default(),
    };
    let level = match state.verifier().verify(&request).await? {
        ProofOutcome::Verified { level } => level,
        ProofOutcome::Rejected { detail } => {
            warn!(nullifier = %request.nullifier_hash, detail = %detail, "identity proof rejected");
            return Err(GatewayError::validation(format!(
                "World ID verification failed: {detail}"
            )));
        }
    };

    let record = VerificationRecord {
        nullifier_hash: request.nullifier_hash,
        merkle_root: request.merkle_root,
        proof: request.proof,
        verification_level: level,
        verified_at: Utc::now(),
    };
    let user_id = match WalletAddress::parse(&request.signal) {
        Ok(wallet) => bind_verification(&state, &wallet, &record).await?,
        Err(_) => {
            debug!("identity proof carries no wallet signal, not cached");
            None
        }
    };

    Ok(Json(VerifyWorldIdResponse {
        success: true,
        nullifier_hash: record.nullifier_hash,
        merkle_root: record.merkle_root,
        proof: record.proof,
        verification_level: record.verification_level,
        verified_at: record.verified_at,
        user_id,
    }))
}

async fn bind_verification<V: ProofVerifier>(
    state: &AppState<V>,
    wallet: &WalletAddress,
    record: &VerificationRecord,
) -> GatewayResult<Option<String>> {
    state.identity().record(wallet, record.clone())?;
    if state.users().find_by_wallet(wallet).await?.is_none() {
        return Ok(None);
    }

    let outcome = state.users().upsert_on_login(wallet, Some(record)).await?;
    if outcome.newly_verified {
        pay_bonus(state, wallet, state.config().rewards.verification_bonus).await;
    }
    Ok(Some(outcome.user.id))
}

/// Pay a one-time bonus; never fails the request.
async fn pay_bonus<V: ProofVerifier>(state: &AppState<V>, wallet: &WalletAddress, amount: u64) {
    match state
        .ledger()
        .initialize_with_verification_bonus(wallet, true, Amount::from_tokens(amount))
        .await
    {
        Ok(Some(tx)) => info!(wallet = %wallet, amount, tx = %tx.id, "bonus paid"),
        Ok(None) => debug!(wallet = %wallet, "bonus already settled"),
        Err(e) => error!(wallet = %wallet, amount, error = %e, "bonus payment failed"),
    }
}

/// Handle POST /api/auth/wallet - sign in with a wallet signature.
pub async fn wallet_auth<V: ProofVerifier>(
    State(state): State<Arc<AppState<V>>>,
    payload: Result<Json<WalletAuthRequest>, JsonRejection>,
) -> GatewayResult<Json<WalletAuthResponse>> {
    let Json(body) = payload?;
    let (Some(address), Some(signature), Some(message)) = (
        present(body.wallet_address),
        present(body.signature),
        present(body.message),
    ) else {
        return Err(GatewayError::validation("Missing required authentication fields"));
    };

    let wallet = WalletAddress::parse(&address)?;
    wallet
        .verify_signature(message.as_bytes(), &signature)
        .map_err(|e| {
            warn!(wallet = %wallet, error = %e, "wallet signature rejected");
            GatewayError::authentication("Invalid wallet signature")
        })?;

    let verification = state.identity().get(&wallet);
    let claims_verified = body
        .world_id_data
        .as_ref()
        .and_then(|data| data.get("verified"))
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    if claims_verified && verification.is_none() {
        debug!(wallet = %wallet, "ignoring identity claim without a verified proof");
    }

    let outcome = state
        .users()
        .upsert_on_login(&wallet, verification.as_ref())
        .await?;
    if outcome.newly_verified {
        pay_bonus(&state, &wallet, state.config().rewards.welcome_bonus).await;
    }
    if outcome.created {
        info!(wallet = %wallet, user = %outcome.user.id, "new user signed in");
    }

    let token = state.sessions().issue(&wallet)?;
    let balance = state.ledger().balance(&wallet).available.tokens();
    Ok(Json(WalletAuthResponse {
        success: true,
        token,
        user: UserView::new(outcome.user, balance),
    }))
}

/// Handle POST /api/reviews - submit a review as the session wallet.
pub async fn submit_review<V: ProofVerifier>(
    State(state): State<Arc<AppState<V>>>,
    Session(wallet): Session,
    payload: Result<Json<SubmitReviewRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<SubmittedReview>)> {
    let Json(body) = payload?;
    let submitted = state
        .reviews()
        .submit(NewReview {
            business_id: body.business_id,
            reviewer: wallet,
            rating: body.rating,
            title: body.title,
            content: body.content,
            has_media: body.has_media,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(submitted)))
}

/// Handle POST /api/reviews/{id}/votes - vote a review helpful or not.
pub async fn cast_vote<V: ProofVerifier>(
    State(state): State<Arc<AppState<V>>>,
    Session(wallet): Session,
    Path(id): Path<String>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> GatewayResult<Json<ReviewRecord>> {
    let Json(vote) = payload?;
    let review = state.reviews().cast_vote(&id, &wallet, vote.helpful).await?;
    Ok(Json(review))
}

/// Handle POST /api/reviews/{id}/attest - attest a review on the ledger.
pub async fn attest_review<V: ProofVerifier>(
    State(state): State<Arc<AppState<V>>>,
    Session(wallet): Session,
    Path(id): Path<String>,
) -> GatewayResult<Json<AttestResponse>> {
    let tx_hash = state.reviews().attest(&id, &wallet).await?;
    Ok(Json(AttestResponse {
        review_id: id,
        tx_hash,
    }))
}

/// Largest page a business search returns.
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Handle POST /api/businesses - register a listing owned by the session wallet.
pub async fn create_business<V: ProofVerifier>(
    State(state): State<Arc<AppState<V>>>,
    Session(wallet): Session,
    payload: Result<Json<CreateBusinessRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<BusinessRecord>)> {
    let Json(body) = payload?;
    let business = state
        .businesses()
        .create(NewBusiness {
            name: body.name,
            slug: body.slug,
            description: body.description,
            website: present(body.website),
            category: body.category,
            owner_wallet: wallet,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(business)))
}

/// Handle GET /api/businesses - search active listings.
pub async fn search_businesses<V: ProofVerifier>(
    State(state): State<Arc<AppState<V>>>,
    query: Result<Query<BusinessQuery>, QueryRejection>,
) -> GatewayResult<Json<Vec<BusinessRecord>>> {
    let Query(query) = query?;
    let search = BusinessSearch {
        query: present(query.q),
        filter: present(query.filter),
        sort: query.sort,
        limit: query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT),
    };
    let found = state.businesses().search(&search).await?;
    debug!(results = found.len(), "businesses searched");
    Ok(Json(found))
}

/// Handle GET /api/businesses/{slug} - a business with its reviews.
pub async fn get_business<V: ProofVerifier>(
    State(state): State<Arc<AppState<V>>>,
    Path(slug): Path<String>,
) -> GatewayResult<Json<BusinessView>> {
    Ok(Json(state.business_view(&slug).await?))
}

/// Handle GET /api/tokens/balance - balance and newest transactions.
pub async fn balance<V: ProofVerifier>(
    State(state): State<Arc<AppState<V>>>,
    Session(wallet): Session,
    query: Result<Query<BalanceQuery>, QueryRejection>,
) -> GatewayResult<Json<BalanceResponse>> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRANSACTION_LIMIT)
        .min(TRANSACTION_LOG_CAPACITY);
    Ok(Json(BalanceResponse {
        balance: state.ledger().balance(&wallet),
        transactions: state.ledger().transactions(&wallet, limit),
        wallet,
    }))
}

/// Handle POST /api/tokens/spend - spend tokens from the session wallet.
pub async fn spend<V: ProofVerifier>(
    State(state): State<Arc<AppState<V>>>,
    Session(wallet): Session,
    payload: Result<Json<SpendRequest>, JsonRejection>,
) -> GatewayResult<Json<SpendResponse>> {
    let Json(body) = payload?;
    let amount = Amount::non_zero(body.amount)?;
    let description = present(body.description).unwrap_or_else(|| "Token spend".to_string());
    let transaction = state
        .ledger()
        .spend(
            &wallet,
            amount,
            &description,
            body.context_type.unwrap_or(ContextType::PromotionPayment),
            body.context_id,
        )
        .await?;
    Ok(Json(SpendResponse {
        transaction,
        balance: state.ledger().balance(&wallet),
    }))
}
