use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use sha1::Sha1;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::pairing::CONFIRMATION_PROMPT;
use super::{AppToken, AuthError, ChallengeClient, ConfirmationGate, CredentialStore, DeviceIdentity, PairingFlow};
use crate::config::Endpoints;
use crate::models::{ApiResponse, SessionRequest, SessionResult};

type HmacSha1 = Hmac<Sha1>;

/// Session password: lowercase hex HMAC-SHA1 of the challenge, keyed by the app token.
pub fn hmac_sha1(app_token: &str, challenge: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha1::new_from_slice(app_token.as_bytes())
        .expect("HMAC can accept any key length");
    mac.update(challenge.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Short-lived token sent as `X-Fbx-App-Auth`. Held in memory only.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Owns the session token shared by every API caller.
///
/// The token lives behind an async mutex that stays locked while a session is
/// being derived, so concurrent callers wait for one derivation instead of
/// racing each other.
pub struct SessionManager {
    client: Client,
    endpoints: Endpoints,
    identity: DeviceIdentity,
    store: Arc<CredentialStore>,
    challenges: ChallengeClient,
    gate: Arc<dyn ConfirmationGate>,
    cancel: CancellationToken,
    pairing_poll_interval: Option<Duration>,
    token: Mutex<Option<SessionToken>>,
}

impl SessionManager {
    pub fn new(
        client: Client,
        endpoints: Endpoints,
        identity: DeviceIdentity,
        store: Arc<CredentialStore>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        Self {
            challenges: ChallengeClient::new(client.clone()),
            client,
            endpoints,
            identity,
            store,
            gate,
            cancel: CancellationToken::new(),
            pairing_poll_interval: None,
            token: Mutex::new(None),
        }
    }

    /// Abort a pairing in progress when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_pairing_poll_interval(mut self, interval: Duration) -> Self {
        self.pairing_poll_interval = Some(interval);
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Return the cached session token, pairing and/or logging in first if needed.
    pub async fn ensure_token(&self) -> Result<SessionToken, AuthError> {
        let mut current = self.token.lock().await;
        if let Some(ref token) = *current {
            return Ok(token.clone());
        }

        let app_token = match self.app_token() {
            Ok(token) => token,
            Err(AuthError::CredentialNotFound(_)) => self.pair().await?,
            Err(e) => return Err(e),
        };

        let token = self.derive(&app_token).await?;
        *current = Some(token.clone());
        Ok(token)
    }

    /// Derive a fresh session from `app_token`, replacing the cached one. Never pairs.
    pub async fn renew(&self, app_token: &AppToken) -> Result<SessionToken, AuthError> {
        let mut current = self.token.lock().await;
        let token = self.derive(app_token).await?;
        *current = Some(token.clone());
        Ok(token)
    }

    /// Renew after the API rejected `stale`.
    ///
    /// If another caller already replaced `stale`, its token is returned as-is.
    pub async fn renew_stale(&self, stale: &SessionToken) -> Result<SessionToken, AuthError> {
        let mut current = self.token.lock().await;
        if let Some(ref token) = *current {
            if token != stale {
                debug!("Session already renewed by another caller");
                return Ok(token.clone());
            }
        }

        let app_token = self.app_token()?;
        let token = self.derive(&app_token).await?;
        *current = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached session; the next `ensure_token` logs in again.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    pub async fn current(&self) -> Option<SessionToken> {
        self.token.lock().await.clone()
    }

    /// Stored app token, from the store's cache or from disk.
    pub fn app_token(&self) -> Result<AppToken, AuthError> {
        match self.store.cached() {
            Some(token) => Ok(token),
            None => self.store.load(),
        }
    }

    async fn pair(&self) -> Result<AppToken, AuthError> {
        let mut flow = PairingFlow::new(
            self.client.clone(),
            self.endpoints.clone(),
            self.identity.clone(),
            self.store.clone(),
        )
        .with_cancellation(self.cancel.clone());
        if let Some(interval) = self.pairing_poll_interval {
            flow = flow.with_poll_interval(interval);
        }

        let app_token = flow.run().await?;

        let gate = self.gate.clone();
        tokio::task::spawn_blocking(move || gate.confirm(CONFIRMATION_PROMPT))
            .await
            .map_err(|e| AuthError::Confirmation(e.to_string()))??;

        Ok(app_token)
    }

    async fn derive(&self, app_token: &AppToken) -> Result<SessionToken, AuthError> {
        let challenge = self.challenges.fetch(&self.endpoints.login()).await?;
        let password = hmac_sha1(app_token.as_str(), &challenge.value);

        let body = SessionRequest {
            app_id: &self.identity.app_id,
            password: &password,
        };

        let response = self
            .client
            .post(self.endpoints.session())
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::SessionRequest(e.to_string()))?;

        let envelope: ApiResponse<SessionResult> = response
            .json()
            .await
            .map_err(|e| AuthError::SessionRequest(e.to_string()))?;

        if !envelope.success {
            let reason = match envelope.message() {
                "" => envelope.error_code().unwrap_or("session refused").to_string(),
                msg => msg.to_string(),
            };
            return Err(AuthError::SessionRejected(reason));
        }

        let result = envelope
            .result
            .filter(|r| !r.session_token.is_empty())
            .ok_or_else(|| AuthError::SessionRequest("reply has no session token".to_string()))?;

        info!(permissions = ?result.granted_permissions(), "Successfully authenticated");
        Ok(SessionToken::new(result.session_token))
    }
}
