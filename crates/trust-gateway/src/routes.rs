//! Route configuration for the TrustHub API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::HttpSection;
use crate::handlers::{
    attest_review, balance, cast_vote, create_business, get_business, health, search_businesses,
    spend, submit_review, verify_world_id, wallet_auth,
};
use crate::identity::ProofVerifier;
use crate::state::AppState;

/// Create the API router.
pub fn create_router<V: ProofVerifier>(state: Arc<AppState<V>>) -> Router {
    let cors = build_cors_layer(&state.config().server);

    let api_routes = Router::new()
        .route("/health", get(health::<V>))
        // Identity and sessions
        .route("/auth/verify-world-id", post(verify_world_id::<V>))
        .route("/auth/wallet", post(wallet_auth::<V>))
        // Reviews
        .route("/reviews", post(submit_review::<V>))
        .route("/reviews/{id}/votes", post(cast_vote::<V>))
        .route("/reviews/{id}/attest", post(attest_review::<V>))
        // Businesses
        .route(
            "/businesses",
            get(search_businesses::<V>).post(create_business::<V>),
        )
        .route("/businesses/{slug}", get(get_business::<V>))
        // Tokens
        .route("/tokens/balance", get(balance::<V>))
        .route("/tokens/spend", post(spend::<V>));

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &HttpSection) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
