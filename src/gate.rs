//! Request gate: network exceptions first, HTTP Basic credentials second.
//!
//! # Decision Flow
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │  Trust check     │ ── trusted ──► Forward (reason: exception)
//! └────────┬─────────┘
//!          │ untrusted
//!          ▼
//! ┌──────────────────┐
//! │  Credential check│ ← blocking pool
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Extra time      │ ← always, pass or fail
//! └────────┬─────────┘
//!          │
//!    ok ───┴─── fail
//!    │            │
//!    ▼            ▼
//! Forward      401 + WWW-Authenticate
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let gate = AuthGate::new(&config.gate, Arc::new(SystemResolver)).await?;
//! let app = Router::new()
//!     .route("/", get(handler))
//!     .layer(AuthGateLayer::new(Arc::new(gate)));
//! ```
//!
//! The remote address is taken from axum's `ConnectInfo<SocketAddr>`, so the
//! router must be served with `into_make_service_with_connect_info`. Without
//! it, no caller is ever trusted by address.
//!
//! Failed trust and failed credentials look identical to the client; the
//! difference only shows up in the logs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, Request, Response, StatusCode};
use axum::response::IntoResponse;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use tower::{Layer, Service};
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::config::{DEFAULT_REALM, GateConfig};
use crate::credentials::CredentialStore;
use crate::duration::parse_or_disabled;
use crate::error::GateResult;
use crate::exceptions::{ExceptionChecker, HostResolver};
use crate::metrics;

/// Body of every challenge response.
pub const CHALLENGE_BODY: &str = "401 Unauthorized\n";

/// Why a request was let through. Inserted into request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthReason {
    /// Remote address is on an exception list.
    Exception,
    /// Valid Basic credentials.
    BasicAuth,
}

impl AuthReason {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthReason::Exception => "exception",
            AuthReason::BasicAuth => "basic_auth",
        }
    }
}

/// Name of the user admitted by Basic auth. Inserted into request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Forward {
        reason: AuthReason,
        user: Option<String>,
    },
    Challenge,
}

/// Credentials decoded from an `Authorization: Basic` header.
pub struct BasicCredentials {
    pub user: String,
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Decode an `Authorization` header value of the `Basic` scheme.
///
/// The scheme is matched case-insensitively and the payload is split on the
/// first `:`, so passwords may contain colons. Returns `None` for any other
/// scheme or malformed payload.
pub fn extract_basic_credentials(header: &str) -> Option<BasicCredentials> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = Zeroizing::new(BASE64.decode(encoded.trim()).ok()?);
    let decoded = std::str::from_utf8(&decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;

    Some(BasicCredentials {
        user: user.to_string(),
        password: Zeroizing::new(password.to_string()),
    })
}

/// Shared decision core behind [`AuthGateLayer`].
#[derive(Debug)]
pub struct AuthGate {
    exceptions: ExceptionChecker,
    credentials: Arc<CredentialStore>,
    realm: String,
    challenge: HeaderValue,
    extra_time: Duration,
}

impl AuthGate {
    /// Build a gate from configuration.
    ///
    /// Loads users, parses the exception lists and resolves exception hosts
    /// once before returning.
    ///
    /// # Errors
    ///
    /// Fails if the users file cannot be read or any credential line is
    /// malformed.
    pub async fn new(config: &GateConfig, resolver: Arc<dyn HostResolver>) -> GateResult<Self> {
        let credentials = CredentialStore::from_config(&config.basic_auth).await?;
        let exceptions = ExceptionChecker::new(&config.exceptions, resolver);
        exceptions.prime().await;
        let extra_time = parse_or_disabled("authExtraTime", &config.auth_extra_time);

        let gate = Self::from_parts(
            exceptions,
            credentials,
            config.basic_auth.realm_or_default(),
            extra_time,
        );
        info!(
            realm = %gate.realm,
            users = gate.credentials.len(),
            extra_time_ms = gate.extra_time.as_millis(),
            "Auth gate initialized"
        );
        Ok(gate)
    }

    /// Assemble a gate from already-built parts. An empty `realm` means
    /// [`DEFAULT_REALM`].
    pub fn from_parts(
        exceptions: ExceptionChecker,
        credentials: CredentialStore,
        realm: &str,
        extra_time: Duration,
    ) -> Self {
        let realm = if realm.is_empty() { DEFAULT_REALM } else { realm };
        let (realm, challenge) = match challenge_header(realm) {
            Some(value) => (realm.to_string(), value),
            None => {
                warn!(
                    realm,
                    default = DEFAULT_REALM,
                    "Realm is not a valid header value, using default"
                );
                let fallback = HeaderValue::from_static("Basic realm=\"restricted\"");
                (DEFAULT_REALM.to_string(), fallback)
            }
        };

        Self {
            exceptions,
            credentials: Arc::new(credentials),
            realm,
            challenge,
            extra_time,
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn extra_time(&self) -> Duration {
        self.extra_time
    }

    pub fn exceptions(&self) -> &ExceptionChecker {
        &self.exceptions
    }

    /// Decide whether a request from `remote_addr` may pass.
    pub async fn decide(&self, remote_addr: &str, authorization: Option<&str>) -> GateDecision {
        if self.exceptions.is_trusted_remote_addr(remote_addr).await {
            debug!(remote_addr, "Remote address is on an exception list");
            metrics::record_decision("forward", AuthReason::Exception.as_str());
            return GateDecision::Forward {
                reason: AuthReason::Exception,
                user: None,
            };
        }

        let verified = self.check_credentials(authorization).await;

        if !self.extra_time.is_zero() {
            tokio::time::sleep(self.extra_time).await;
        }

        match verified {
            Some(user) => {
                debug!(remote_addr, user = %user, "Basic auth succeeded");
                metrics::record_decision("forward", AuthReason::BasicAuth.as_str());
                GateDecision::Forward {
                    reason: AuthReason::BasicAuth,
                    user: Some(user),
                }
            }
            None => {
                metrics::record_decision("challenge", "none");
                GateDecision::Challenge
            }
        }
    }

    /// Returns the user name when the header carries valid credentials.
    async fn check_credentials(&self, authorization: Option<&str>) -> Option<String> {
        let Some(BasicCredentials { user, password }) =
            authorization.and_then(extract_basic_credentials)
        else {
            debug!("Missing or malformed Basic credentials");
            return None;
        };

        let store = self.credentials.clone();
        let task = tokio::task::spawn_blocking(move || {
            let verified = store.verify(&user, &password);
            (user, verified)
        });

        match task.await {
            Ok((user, true)) => Some(user),
            Ok((_, false)) => None,
            Err(e) => {
                error!(error = %e, "Credential verification task failed");
                None
            }
        }
    }

    /// Build the 401 response carrying the Basic challenge.
    pub fn challenge_response(&self) -> Response<Body> {
        (
            StatusCode::UNAUTHORIZED,
            [
                (WWW_AUTHENTICATE, self.challenge.clone()),
                (
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                ),
            ],
            CHALLENGE_BODY,
        )
            .into_response()
    }
}

fn challenge_header(realm: &str) -> Option<HeaderValue> {
    let escaped = realm.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("Basic realm=\"{escaped}\"")).ok()
}

/// Tower layer that runs every request through an [`AuthGate`].
#[derive(Debug, Clone)]
pub struct AuthGateLayer {
    gate: Arc<AuthGate>,
}

impl AuthGateLayer {
    pub fn new(gate: Arc<AuthGate>) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &Arc<AuthGate> {
        &self.gate
    }
}

impl<S> Layer<S> for AuthGateLayer {
    type Service = AuthGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthGateService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

/// Service wrapper produced by [`AuthGateLayer`].
#[derive(Debug, Clone)]
pub struct AuthGateService<S> {
    inner: S,
    gate: Arc<AuthGate>,
}

impl<S> Service<Request<Body>> for AuthGateService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let remote_addr = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.to_string())
                .unwrap_or_default();
            let authorization = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);

            match gate.decide(&remote_addr, authorization.as_deref()).await {
                GateDecision::Forward { reason, user } => {
                    req.extensions_mut().insert(reason);
                    if let Some(user) = user {
                        req.extensions_mut().insert(AuthenticatedUser(user));
                    }
                    inner.call(req).await
                }
                GateDecision::Challenge => {
                    warn!(
                        path = %req.uri().path(),
                        remote_addr = %remote_addr,
                        credentials_provided = authorization.is_some(),
                        "Request challenged"
                    );
                    Ok(gate.challenge_response())
                }
            }
        })
    }
}
