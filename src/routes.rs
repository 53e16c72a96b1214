//! Gate server routing.
//!
//! # Middleware Stack
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!          ├──────────────► /health (ungated)
//!          ▼
//! ┌──────────────────┐
//! │    Auth gate     │ ← 401 + WWW-Authenticate on failure
//! └────────┬─────────┘
//!          │
//!          ▼
//!   /verify, /whoami
//! ```

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::gate::{AuthGate, AuthGateLayer};
use crate::handlers;

/// Build the gate server router.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`;
/// otherwise the gate cannot see peer addresses and exception lists never
/// match.
pub fn build_router(gate: Arc<AuthGate>) -> Router {
    let gated = Router::new()
        .route("/verify", get(handlers::verify))
        .route("/whoami", get(handlers::whoami))
        .layer(AuthGateLayer::new(gate));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(gated)
        .layer(TraceLayer::new_for_http())
}
