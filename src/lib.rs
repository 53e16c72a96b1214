//! # Auth Gate
//!
//! HTTP request gate for axum/tower: a request passes either because its
//! remote address is on an exception list, or because it carries valid HTTP
//! Basic credentials. Everything else gets a `401` challenge.
//!
//! - **Exceptions**: literal IPv4 addresses, CIDR blocks, and hostnames
//!   re-resolved on a throttled schedule
//! - **Credentials**: htpasswd-style users (bcrypt, Apache MD5, SHA-1, Argon2)
//! - **Timing**: optional fixed delay on every credential check
//! - **Observability**: structured logging, Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AuthGateLayer / AuthGateService (tower)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AuthGate (decision core)                                   │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │  ExceptionChecker            │  CredentialStore             │
//! │  (AddressList + HostCache)   │  (htpasswd secrets)          │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//!
//! use auth_gate::{AuthGate, Config, SystemResolver, build_router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let gate = AuthGate::new(&config.gate, Arc::new(SystemResolver)).await?;
//!     let app = build_router(Arc::new(gate));
//!
//!     let listener = tokio::net::TcpListener::bind(config.server_addr()).await?;
//!     axum::serve(
//!         listener,
//!         app.into_make_service_with_connect_info::<SocketAddr>(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```bash
//! BASIC_AUTH_USERS='alice:$apr1$Jr5S8Bhm$UYsNM4UIAk3veeslKR2O41' \
//! EXCEPTIONS_IP_LIST=10.0.0.0/8,192.168.1.20 \
//! cargo run
//! ```

pub mod config;
pub mod credentials;
pub mod duration;
pub mod error;
pub mod exceptions;
pub mod gate;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod utils;

// Re-exports for convenience
pub use config::{Config, GateConfig};
pub use credentials::CredentialStore;
pub use error::{GateError, GateResult};
pub use exceptions::{ExceptionChecker, HostResolver, SystemResolver};
pub use gate::{AuthGate, AuthGateLayer, AuthReason, AuthenticatedUser, GateDecision};
pub use routes::build_router;
