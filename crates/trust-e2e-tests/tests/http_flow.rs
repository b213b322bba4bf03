//! End-to-end HTTP tests against a running `trusthub-server`.
//!
//! These tests verify:
//! 1. Identity verification, wallet sign-in and the welcome bonus
//! 2. Review submission pays the scored reward and is reconciled
//! 3. Spending burns tokens and refreshes the cached balance
//! 4. Migrated fixtures are served by the business endpoint
//! 5. Owners register listings that become searchable once approved

mod helpers;

use std::sync::Arc;

use helpers::{TestServer, create_business, eventually, review_text};
use serde_json::{Value, json};
use trust_cli::{Fixtures, MigrationRunner};
use trust_store::collections::{BUSINESSES, USERS};
use trust_store::{DocumentStore, fields};
use trust_token::Wallet;

fn approx(value: &Value, expected: f64) -> bool {
    value.as_f64().is_some_and(|v| (v - expected).abs() < 0.01)
}

async fn cached_balance(server: &TestServer, token: &str) -> u64 {
    let (status, balance) = server.get("/api/tokens/balance", Some(token)).await;
    assert_eq!(status, 200);
    let wallet = balance["wallet"].as_str().expect("wallet").to_string();
    let state = server.server.state();
    let filter = trust_store::Filter::eq("wallet_address", wallet);
    state
        .store()
        .first(USERS, &filter)
        .await
        .expect("query user")
        .and_then(|record| record.get("trh_balance"))
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}

// ============================================================================
// Verified reviewer
// ============================================================================

#[tokio::test]
async fn test_verified_reviewer_flow() {
    let server = TestServer::start().await;
    let wallet = Wallet::generate().expect("wallet");

    let (status, verified) = server.verify_identity(&wallet, "0xnullifier-1").await;
    assert_eq!(status, 200, "verify failed: {verified}");
    assert_eq!(verified["success"], true);
    assert!(verified["user_id"].is_null());

    let (token, user) = server.sign_in(&wallet).await;
    assert_eq!(user["world_id_verified"], true);
    assert_eq!(user["trh_balance"], 100);

    let business = create_business(server.server.state().store().as_ref(), "Urban Eats", "urban-eats").await;
    let (status, submitted) = server
        .post(
            "/api/reviews",
            Some(&token),
            &json!({
                "business_id": business,
                "rating": 5,
                "title": "Best brunch in town",
                "content": review_text(250),
            }),
        )
        .await;
    assert_eq!(status, 201, "submit failed: {submitted}");
    assert!(approx(&submitted["score"]["overall_score"], 45.0));
    assert!(approx(&submitted["score"]["multiplier"], 3.0));
    assert_eq!(submitted["reward"], 55);
    assert_eq!(submitted["early_reviewer"], true);

    let (status, balance) = server.get("/api/tokens/balance", Some(&token)).await;
    assert_eq!(status, 200);
    assert_eq!(balance["balance"]["available"], 155);
    assert_eq!(balance["balance"]["earned"], 155);
    assert_eq!(balance["transactions"].as_array().map(Vec::len), Some(2));

    let review_id = submitted["review"]["id"].as_str().expect("review id").to_string();
    let state = server.server.state();
    let confirmed = eventually(|| {
        let state = Arc::clone(&state);
        let review_id = review_id.clone();
        async move {
            state
                .store()
                .get(trust_store::collections::REVIEWS, &review_id)
                .await
                .is_ok_and(|r| r.bool_field("chain_verified"))
        }
    })
    .await;
    assert!(confirmed, "review never confirmed");

    let srv = &server;
    let token_ref = token.as_str();
    assert!(eventually(|| async move { cached_balance(srv, token_ref).await == 155 }).await);

    let (status, spent) = server
        .post(
            "/api/tokens/spend",
            Some(&token),
            &json!({ "amount": 30, "description": "Featured listing" }),
        )
        .await;
    assert_eq!(status, 200, "spend failed: {spent}");
    assert_eq!(spent["balance"]["available"], 125);
    assert_eq!(spent["balance"]["spent"], 30);
    assert_eq!(spent["transaction"]["status"], "confirmed");

    assert!(eventually(|| async move { cached_balance(srv, token_ref).await == 125 }).await);

    let (status, refused) = server
        .post("/api/tokens/spend", Some(&token), &json!({ "amount": 1000 }))
        .await;
    assert_eq!(status, 402);
    assert_eq!(refused["error"], "insufficient_balance");
    assert_eq!(refused["available"], 125);

    server.shutdown().await;
}

#[tokio::test]
async fn test_established_reviewer_earns_base_reward() {
    let server = TestServer::start().await;
    let state = server.server.state();
    let business = create_business(state.store().as_ref(), "The Daily Grind", "the-daily-grind").await;

    let first = Wallet::generate().expect("wallet");
    let (first_token, _) = server.sign_in(&first).await;
    let (status, _) = server
        .post(
            "/api/reviews",
            Some(&first_token),
            &json!({ "business_id": business, "rating": 4, "content": review_text(80) }),
        )
        .await;
    assert_eq!(status, 201);

    let wallet = Wallet::generate().expect("wallet");
    let (status, _) = server.verify_identity(&wallet, "0xnullifier-2").await;
    assert_eq!(status, 200);
    let (token, user) = server.sign_in(&wallet).await;
    let user_id = user["id"].as_str().expect("user id");
    let joined = chrono::Utc::now() - chrono::Duration::days(30);
    state
        .store()
        .update(USERS, user_id, fields(json!({ "joined_at": joined })).expect("fields"))
        .await
        .expect("backdate user");

    let (status, submitted) = server
        .post(
            "/api/reviews",
            Some(&token),
            &json!({ "business_id": business, "rating": 5, "content": review_text(250) }),
        )
        .await;
    assert_eq!(status, 201, "submit failed: {submitted}");
    assert!(approx(&submitted["score"]["overall_score"], 60.0));
    assert!(approx(&submitted["score"]["multiplier"], 2.2));
    assert_eq!(submitted["reward"], 27);
    assert_eq!(submitted["early_reviewer"], false);

    let (_, balance) = server.get("/api/tokens/balance", Some(&token)).await;
    assert_eq!(balance["balance"]["available"], 127);

    server.shutdown().await;
}

#[tokio::test]
async fn test_sign_in_rejects_bad_signature() {
    let server = TestServer::start().await;
    let wallet = Wallet::generate().expect("wallet");
    let other = Wallet::generate().expect("wallet");

    let message = "Sign in to TrustHub";
    let (status, body) = server
        .post(
            "/api/auth/wallet",
            None,
            &json!({
                "wallet_address": wallet.address().as_str(),
                "signature": other.sign(message.as_bytes()),
                "message": message,
            }),
        )
        .await;
    assert_eq!(status, 401, "unexpected: {body}");

    let (status, _) = server.get("/api/tokens/balance", None).await;
    assert_eq!(status, 401);
    let (status, _) = server.get("/api/tokens/balance", Some("not-a-token")).await;
    assert_eq!(status, 401);

    server.shutdown().await;
}

// ============================================================================
// Business listings
// ============================================================================

#[tokio::test]
async fn test_registered_business_listed_after_approval() {
    let server = TestServer::start().await;
    let owner = Wallet::generate().expect("wallet");
    let (token, _) = server.sign_in(&owner).await;

    let (status, created) = server
        .post(
            "/api/businesses",
            Some(&token),
            &json!({
                "name": "Harbor Bakery",
                "description": "Sourdough and morning buns",
                "category": "bakery",
            }),
        )
        .await;
    assert_eq!(status, 201, "create failed: {created}");
    assert_eq!(created["slug"], "harbor-bakery");
    assert_eq!(created["status"], "pending");
    assert_eq!(created["claimed"], true);

    let (_, found) = server.get("/api/businesses?q=sourdough", None).await;
    assert_eq!(found.as_array().map(Vec::len), Some(0));
    let (status, _) = server.get("/api/businesses/harbor-bakery", None).await;
    assert_eq!(status, 404);

    let id = created["id"].as_str().expect("id");
    server
        .server
        .state()
        .store()
        .update(BUSINESSES, id, fields(json!({ "status": "active" })).expect("fields"))
        .await
        .expect("approve");

    let (status, found) = server.get("/api/businesses?q=SOURDOUGH&sort=rating", None).await;
    assert_eq!(status, 200, "search failed: {found}");
    assert_eq!(found[0]["slug"], "harbor-bakery");
    let (status, view) = server.get("/api/businesses/harbor-bakery", None).await;
    assert_eq!(status, 200);
    assert_eq!(view["business"]["owner_wallet"], owner.address().as_str());

    server.shutdown().await;
}

// ============================================================================
// Migration
// ============================================================================

#[tokio::test]
async fn test_migrated_fixtures_are_served() {
    let server = TestServer::start().await;
    let runner = MigrationRunner::new(
        Arc::clone(server.server.state().store()),
        Fixtures::embedded().expect("fixtures"),
    );
    let report = runner.run().await;
    assert!(report.success, "migration failed: {:?}", report.error);

    let (status, view) = server.get("/api/businesses/the-daily-grind", None).await;
    assert_eq!(status, 200, "unexpected: {view}");
    assert_eq!(view["business"]["name"], "The Daily Grind");
    assert_eq!(view["business"]["total_reviews"], 4);
    assert_eq!(view["reviews"].as_array().map(Vec::len), Some(4));
    assert_eq!(view["stale"], false);

    let (status, _) = server.get("/api/businesses/no-such-place", None).await;
    assert_eq!(status, 404);

    server.shutdown().await;
}
