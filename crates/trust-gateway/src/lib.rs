//! # trust-gateway
//!
//! HTTP API for TrustHub: identity proofs, wallet sign-in, review
//! submission and token balances.
//!
//! The API is an axum router over an [`AppState`] holding the document
//! store, the token balance store, the review and reconciliation services
//! and the session issuer. Sessions are HS256 JWTs whose subject is the
//! wallet address.
//!
//! ## Example
//!
//! ```rust,no_run
//! use trust_gateway::{RemoteProofVerifier, ServerConfig, TrustHubServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::from_file("trusthub.toml")?;
//!     let verifier = RemoteProofVerifier::new(&config.identity);
//!     let addr = config.server.bind_addr;
//!
//!     let server = TrustHubServer::new(config, verifier);
//!     server.start_background().await?;
//!     server.serve(addr).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/api/health` | GET | Service, store and sync status |
//! | `/api/auth/verify-world-id` | POST | Verify an identity proof |
//! | `/api/auth/wallet` | POST | Sign in with a wallet signature |
//! | `/api/reviews` | POST | Submit a review (bearer) |
//! | `/api/reviews/{id}/votes` | POST | Helpful / not helpful vote (bearer) |
//! | `/api/reviews/{id}/attest` | POST | Attest a review on the ledger (bearer) |
//! | `/api/businesses/{slug}` | GET | Business with published reviews |
//! | `/api/tokens/balance` | GET | Balance and newest transactions (bearer) |
//! | `/api/tokens/spend` | POST | Spend tokens (bearer) |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;
pub mod types;

// Re-export main types
pub use config::ServerConfig;
pub use error::{GatewayError, GatewayResult};
pub use identity::{ProofOutcome, ProofRequest, ProofVerifier, RemoteProofVerifier, StaticProofVerifier};
pub use routes::create_router;
pub use server::TrustHubServer;
pub use session::SessionIssuer;
pub use state::AppState;
