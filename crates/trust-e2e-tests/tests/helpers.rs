//! Test helpers for E2E tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use trust_core::{IdentityCache, ReviewService, UserRecord};
use trust_gateway::{ServerConfig, StaticProofVerifier, TrustHubServer};
use trust_store::collections::{BUSINESSES, USERS};
use trust_store::{DocumentStore, MemoryStore, fields};
use trust_sync::{ReconciliationService, SyncConfig};
use trust_token::{LedgerConfig, SimulatedLedger, TokenLedger, Wallet, WalletAddress};

/// Default test timeout.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Session secret used by test servers.
pub const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";

/// Reconciliation tick used by tests.
pub const FAST_TICK: Duration = Duration::from_millis(10);

/// Poll `check` until it returns `true` or [`TEST_TIMEOUT`] passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + TEST_TIMEOUT;
    while Instant::now() < deadline {
        if check().await {
            return true;
        }
        sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Review text of exactly `len` characters, ending in a period.
pub fn review_text(len: usize) -> String {
    let mut text = "Lovely espresso and kind baristas. ".repeat(len / 35 + 1);
    text.truncate(len - 1);
    text.push('.');
    text
}

/// Create a business and return its record ID.
pub async fn create_business<S: DocumentStore>(store: &S, name: &str, slug: &str) -> String {
    store
        .create(
            BUSINESSES,
            fields(json!({
                "name": name,
                "slug": slug,
                "category": "Coffee Shop",
                "status": "active",
            }))
            .expect("business fields"),
        )
        .await
        .expect("create business")
        .id
}

/// Create a user who joined `days_ago` days ago.
pub async fn create_user<S: DocumentStore>(
    store: &S,
    wallet: &WalletAddress,
    verified: bool,
    days_ago: i64,
) -> String {
    let mut user = UserRecord::new(wallet.clone());
    user.world_id_verified = verified;
    user.joined_at = Some(chrono::Utc::now() - chrono::Duration::days(days_ago));
    store
        .create(USERS, fields(&user).expect("user fields"))
        .await
        .expect("create user")
        .id
}

/// In-process stack without HTTP: store, ledger, review service and
/// reconciliation wired the way the server wires them.
pub struct Stack {
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<TokenLedger<SimulatedLedger>>,
    pub identity: Arc<IdentityCache>,
    pub reviews: ReviewService<MemoryStore, SimulatedLedger>,
    pub sync: ReconciliationService<MemoryStore, SimulatedLedger>,
}

impl Stack {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(SimulatedLedger::new());
        let ledger = Arc::new(TokenLedger::new(Arc::clone(&client), LedgerConfig::instant()));
        let identity = Arc::new(IdentityCache::new());
        let reviews = ReviewService::new(Arc::clone(&store), Arc::clone(&ledger), Arc::clone(&identity));
        let sync = ReconciliationService::new(
            Arc::clone(&store),
            client,
            SyncConfig::default().with_tick_interval(FAST_TICK),
        );
        Self {
            store,
            ledger,
            identity,
            reviews,
            sync,
        }
    }
}

/// Find an available port for testing.
pub async fn find_available_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("local addr").port()
}

/// Test server that manages its own lifecycle.
pub struct TestServer {
    pub addr: SocketAddr,
    pub server: TrustHubServer<StaticProofVerifier>,
    client: reqwest::Client,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server with background services on an available port.
    pub async fn start() -> Self {
        let port = find_available_port().await;
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let mut config = ServerConfig::default()
            .with_session_secret(TEST_SECRET)
            .with_bind_addr(addr);
        config.ledger.award_delay_ms = 0;
        config.ledger.spend_delay_ms = 0;
        config.sync.tick_interval_ms = 10;

        let server = TrustHubServer::new(config, StaticProofVerifier::accepting());
        server.start_background().await.expect("background services");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let serving = server.clone();
        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = serving.serve_with_shutdown(addr, shutdown).await {
                eprintln!("Server error: {e}");
            }
        });

        let test_server = Self {
            addr,
            server,
            client: reqwest::Client::builder().timeout(TEST_TIMEOUT).build().expect("http client"),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        };

        // Wait for server to be ready
        let this = &test_server;
        let ready = eventually(|| async move { this.try_get("/api/health").await.is_some() }).await;
        assert!(ready, "server did not come up on {addr}");
        test_server
    }

    /// Get the base URL for this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn try_get(&self, path: &str) -> Option<u16> {
        let response = self.client.get(self.url(path)).send().await.ok()?;
        Some(response.status().as_u16())
    }

    /// GET `path`, returning the status and JSON body.
    pub async fn get(&self, path: &str, token: Option<&str>) -> (u16, Value) {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Self::read(request.send().await.expect("request sent")).await
    }

    /// POST a JSON body to `path`, returning the status and JSON body.
    pub async fn post(&self, path: &str, token: Option<&str>, body: &Value) -> (u16, Value) {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Self::read(request.send().await.expect("request sent")).await
    }

    async fn read(response: reqwest::Response) -> (u16, Value) {
        let status = response.status().as_u16();
        let bytes = response.bytes().await.expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    /// Submit an identity proof bound to `wallet`.
    pub async fn verify_identity(&self, wallet: &Wallet, nullifier: &str) -> (u16, Value) {
        let body = json!({
            "proof": "0xproof",
            "nullifier_hash": nullifier,
            "merkle_root": "0xroot",
            "signal": wallet.address().as_str(),
        });
        self.post("/api/auth/verify-world-id", None, &body).await
    }

    /// Sign in with a wallet signature, returning the session token and user.
    pub async fn sign_in(&self, wallet: &Wallet) -> (String, Value) {
        let message = "Sign in to TrustHub";
        let body = json!({
            "wallet_address": wallet.address().as_str(),
            "signature": wallet.sign(message.as_bytes()),
            "message": message,
        });
        let (status, json) = self.post("/api/auth/wallet", None, &body).await;
        assert_eq!(status, 200, "sign-in failed: {json}");
        (json["token"].as_str().expect("token").to_string(), json["user"].clone())
    }

    /// Shutdown the server and its background services.
    pub async fn shutdown(mut self) {
        self.server.stop_background();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = tokio::time::timeout(TEST_TIMEOUT, handle).await;
        }
    }
}
