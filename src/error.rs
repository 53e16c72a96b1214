use std::path::PathBuf;

use thiserror::Error;

/// Gate construction and configuration errors.
///
/// Everything here is fatal: a gate that hits one of these during startup
/// refuses to initialize. Runtime problems (bad remote addresses, failed DNS
/// lookups, malformed `Authorization` headers) never surface as errors; they
/// degrade to "not trusted" or "verification failed" and are only logged.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Invalid credential line {line_number}: {reason}")]
    InvalidCredentialLine { line_number: usize, reason: String },

    #[error("Invalid secret for user '{user}': {reason}")]
    InvalidSecret { user: String, reason: String },

    #[error("Failed to read users file {}: {source}", path.display())]
    UsersFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results with GateError.
pub type GateResult<T> = Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_line_error_message() {
        let err = GateError::InvalidCredentialLine {
            line_number: 3,
            reason: "expected 'name:secret'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid credential line 3: expected 'name:secret'"
        );
    }

    #[test]
    fn test_users_file_error_keeps_source() {
        let err = GateError::UsersFile {
            path: PathBuf::from("/etc/gate/users"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/etc/gate/users"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
