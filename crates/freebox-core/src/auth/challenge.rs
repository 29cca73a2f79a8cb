use reqwest::Client;
use tracing::debug;

use super::AuthError;
use crate::models::{ApiResponse, ChallengeResult};

/// One-time nonce issued by `GET login/`. Consumed by a single session derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub value: String,
    pub logged_in: bool,
}

/// Fetches login challenges. Makes a single unauthenticated request per call;
/// retrying is up to the caller.
#[derive(Clone)]
pub struct ChallengeClient {
    client: Client,
}

impl ChallengeClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, login_url: &str) -> Result<Challenge, AuthError> {
        let response = self
            .client
            .get(login_url)
            .send()
            .await
            .map_err(|e| AuthError::ChallengeFetch(e.to_string()))?;

        let status = response.status();
        let envelope: ApiResponse<ChallengeResult> = response
            .json()
            .await
            .map_err(|e| AuthError::ChallengeFetch(format!("Status {}: {}", status, e)))?;

        if !envelope.success {
            return Err(AuthError::ChallengeFetch(envelope.message().to_string()));
        }

        let result = envelope
            .result
            .ok_or_else(|| AuthError::ChallengeFetch("response has no challenge".to_string()))?;

        debug!(logged_in = ?result.logged_in, "Fetched login challenge");
        Ok(Challenge {
            value: result.challenge,
            logged_in: result.logged_in.unwrap_or(false),
        })
    }
}
