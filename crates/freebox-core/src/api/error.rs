use thiserror::Error;

use crate::auth::AuthError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication required - session token rejected after renewal")]
    AuthRequired,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{message} ({code})")]
    Vendor { code: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Map a vendor `error_code` to an error. Unknown codes keep the box's own message.
    pub fn from_error_code(code: &str, msg: &str) -> Self {
        let message = match code {
            "auth_required" => return ApiError::AuthRequired,
            "ratelimited" => return ApiError::RateLimited,
            "invalid_token" => "The app token you are trying to use is invalid or has been revoked",
            "pending_token" => "The app token you are trying to use has not been validated by user yet",
            "insufficient_rights" => "Your app permissions does not allow accessing this API",
            "denied_from_external_ip" => "You are trying to get an app_token from a remote IP",
            "invalid_request" => "Your request is invalid",
            "new_apps_denied" => "New application token request has been disabled",
            "apps_denied" => "API access from apps has been disabled",
            "internal_error" => "Internal error",
            "db_error" => "Oops, The database you are trying to access doesn't seem to exist",
            _ if msg.is_empty() => "The API returned an unknown error_code",
            _ => msg,
        };
        ApiError::Vendor {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// The caller should renew the session and retry once.
    pub fn is_retryable_with_renew(&self) -> bool {
        matches!(self, ApiError::AuthRequired)
    }

    /// Logging in failed. Further calls in the same cycle would only log in
    /// again, and the box rate-limits repeated auth errors.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Auth(_) | ApiError::AuthRequired)
    }

    /// No point continuing to poll: the operator has to step in.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Auth(e) if e.is_fatal())
    }
}
