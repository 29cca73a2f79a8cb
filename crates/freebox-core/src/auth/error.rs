use std::path::PathBuf;

use thiserror::Error;

/// Failures of the pairing/session lifecycle.
///
/// Pairing outcomes carry fixed messages; they are shown to the operator as-is.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No app token stored at {}", .0.display())]
    CredentialNotFound(PathBuf),

    #[error("Failed to access app token file {}: {source}", .path.display())]
    CredentialIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("token should not be blank")]
    EmptyToken,

    #[error("Pairing request failed: {0}")]
    PairingRequest(String),

    #[error("the user denied the authorization request")]
    PairingDenied,

    #[error("the user did not confirm the authorization within the given time")]
    PairingTimedOut,

    #[error("the app_token is invalid or has been revoked")]
    PairingRevoked,

    #[error("Failed to fetch login challenge: {0}")]
    ChallengeFetch(String),

    #[error("Session request failed: {0}")]
    SessionRequest(String),

    #[error("{0}")]
    SessionRejected(String),

    #[error("Operator confirmation failed: {0}")]
    Confirmation(String),

    #[error("Authentication cancelled")]
    Cancelled,
}

impl AuthError {
    /// Errors a long-running poller cannot get past without an operator.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AuthError::PairingDenied
                | AuthError::PairingTimedOut
                | AuthError::PairingRevoked
                | AuthError::Confirmation(_)
                | AuthError::Cancelled
        )
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        AuthError::CredentialIo {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing_messages() {
        assert_eq!(
            AuthError::PairingDenied.to_string(),
            "the user denied the authorization request"
        );
        assert_eq!(
            AuthError::PairingTimedOut.to_string(),
            "the user did not confirm the authorization within the given time"
        );
        assert_eq!(
            AuthError::PairingRevoked.to_string(),
            "the app_token is invalid or has been revoked"
        );
    }

    #[test]
    fn test_session_rejected_is_verbatim() {
        let err = AuthError::SessionRejected("failed to get a session".into());
        assert_eq!(err.to_string(), "failed to get a session");
        assert!(!err.is_fatal());
        assert!(AuthError::PairingDenied.is_fatal());
    }
}
