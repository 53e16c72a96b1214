use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::gate::AuthReason;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// Identity of the caller as seen by the gate.
#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    /// Basic-auth user name (`null` when admitted by exception)
    pub user: Option<String>,
    /// Why the gate let the request through
    pub reason: AuthReason,
}
