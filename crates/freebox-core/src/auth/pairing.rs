use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{AppToken, AuthError, CredentialStore};
use crate::config::{Endpoints, APP_ID, APP_NAME, DEVICE_NAME};
use crate::models::{ApiResponse, AuthorizeRequest, AuthorizeStatus, PairingStatus, TrackResult};

/// Number of status polls before giving up on approval.
/// Short on purpose: the box only shows the prompt for a limited time, and a
/// missed approval is simply re-run.
pub const PAIRING_MAX_ATTEMPTS: u32 = 15;

/// Delay between two status polls.
const PAIRING_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shown to the operator once the app is granted, before the first session.
pub const CONFIRMATION_PROMPT: &str =
    "check \"Modification des réglages de la Freebox\" for this app in Freebox OS and press enter";

/// How this application registers itself with the box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub app_id: String,
    pub app_name: String,
    pub app_version: String,
    pub device_name: String,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            app_id: APP_ID.to_string(),
            app_name: APP_NAME.to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            device_name: DEVICE_NAME.to_string(),
        }
    }
}

/// Manual step after pairing: the operator grants the extra permission in the
/// box's own UI, then acknowledges. Runs on a blocking thread.
pub trait ConfirmationGate: Send + Sync {
    fn confirm(&self, prompt: &str) -> Result<(), AuthError>;
}

/// Waits for the operator to press enter on stdin.
pub struct StdinConfirmation;

impl ConfirmationGate for StdinConfirmation {
    fn confirm(&self, prompt: &str) -> Result<(), AuthError> {
        eprintln!("{}", prompt);
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| AuthError::Confirmation(e.to_string()))?;
        Ok(())
    }
}

/// For headless deployments where permissions were granted up front.
pub struct NoConfirmation;

impl ConfirmationGate for NoConfirmation {
    fn confirm(&self, prompt: &str) -> Result<(), AuthError> {
        debug!(prompt, "Skipping operator confirmation");
        Ok(())
    }
}

/// One-time app registration: request an app token, persist it, then poll
/// until the user approves (or refuses) it on the box.
pub struct PairingFlow {
    client: Client,
    endpoints: Endpoints,
    identity: DeviceIdentity,
    store: Arc<CredentialStore>,
    poll_interval: Duration,
    max_attempts: u32,
    cancel: CancellationToken,
}

impl PairingFlow {
    pub fn new(
        client: Client,
        endpoints: Endpoints,
        identity: DeviceIdentity,
        store: Arc<CredentialStore>,
    ) -> Self {
        Self {
            client,
            endpoints,
            identity,
            store,
            poll_interval: PAIRING_POLL_INTERVAL,
            max_attempts: PAIRING_MAX_ATTEMPTS,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the whole handshake and return the persisted app token.
    pub async fn run(&self) -> Result<AppToken, AuthError> {
        info!(app_id = %self.identity.app_id, "Requesting app authorization, confirm on the Freebox front panel");
        let (token, track_id) = self.request_track_id().await?;
        self.store.save(&token)?;
        self.await_approval(track_id).await?;
        Ok(token)
    }

    async fn request_track_id(&self) -> Result<(AppToken, u64), AuthError> {
        let body = AuthorizeRequest {
            app_id: &self.identity.app_id,
            app_name: &self.identity.app_name,
            app_version: &self.identity.app_version,
            device_name: &self.identity.device_name,
        };

        let response = self
            .client
            .post(self.endpoints.authorize())
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::PairingRequest(e.to_string()))?;

        let envelope: ApiResponse<TrackResult> = response
            .json()
            .await
            .map_err(|e| AuthError::PairingRequest(e.to_string()))?;

        if !envelope.success {
            return Err(AuthError::PairingRequest(
                envelope.error_code().unwrap_or(envelope.message()).to_string(),
            ));
        }

        let track = envelope
            .result
            .ok_or_else(|| AuthError::PairingRequest("response has no track id".to_string()))?;

        debug!(track_id = track.track_id, "Received pairing track id");
        Ok((AppToken::new(track.app_token), track.track_id))
    }

    /// Poll the approval status once per interval.
    ///
    /// Running out of attempts while still pending is not an error: the flow
    /// ends and session derivation decides whether the token works.
    async fn await_approval(&self, track_id: u64) -> Result<(), AuthError> {
        let url = self.endpoints.authorize_status(track_id);

        for attempt in 1..=self.max_attempts {
            if self.cancel.is_cancelled() {
                return Err(AuthError::Cancelled);
            }

            match self.poll_status(&url).await? {
                PairingStatus::Pending => {
                    info!(attempt, "the user has not confirmed the authorization request yet");
                }
                PairingStatus::Granted => {
                    info!("the app_token is valid and can be used to open a session");
                    return Ok(());
                }
                PairingStatus::Denied => return Err(AuthError::PairingDenied),
                PairingStatus::Timeout => return Err(AuthError::PairingTimedOut),
                PairingStatus::Unknown => return Err(AuthError::PairingRevoked),
            }

            if attempt < self.max_attempts {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    _ = self.cancel.cancelled() => return Err(AuthError::Cancelled),
                }
            }
        }

        warn!(
            attempts = self.max_attempts,
            "Authorization still pending after the last poll, continuing anyway"
        );
        Ok(())
    }

    async fn poll_status(&self, url: &str) -> Result<PairingStatus, AuthError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::PairingRequest(e.to_string()))?;

        let envelope: ApiResponse<AuthorizeStatus> = response
            .json()
            .await
            .map_err(|e| AuthError::PairingRequest(e.to_string()))?;

        match envelope.result {
            Some(status) => Ok(status.status),
            None => Err(AuthError::PairingRequest(format!(
                "no status in reply: {}",
                envelope.message()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_track(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v4/login/authorize/"))
            .and(body_partial_json(serde_json::json!({"app_id": APP_ID})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "result": {"app_token": "IOI", "track_id": 101}
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    fn status_reply(status: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "result": {"status": status, "challenge": "abc"}
        }))
    }

    fn pairing_flow(server: &MockServer, dir: &tempfile::TempDir) -> (PairingFlow, Arc<CredentialStore>) {
        let store = Arc::new(CredentialStore::new(dir.path().join("token")));
        let flow = PairingFlow::new(
            Client::new(),
            Endpoints::new(&server.uri(), "v4"),
            DeviceIdentity::default(),
            store.clone(),
        )
        .with_poll_interval(Duration::from_millis(10));
        (flow, store)
    }

    #[tokio::test]
    async fn test_granted_on_first_poll() {
        let server = MockServer::start().await;
        mount_track(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v4/login/authorize/101"))
            .respond_with(status_reply("granted"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (flow, store) = pairing_flow(&server, &dir);
        let token = flow.run().await.unwrap();
        assert_eq!(token.as_str(), "IOI");
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "IOI");
    }

    #[tokio::test]
    async fn test_pending_then_granted() {
        let server = MockServer::start().await;
        mount_track(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v4/login/authorize/101"))
            .respond_with(status_reply("pending"))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v4/login/authorize/101"))
            .respond_with(status_reply("granted"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (flow, _) = pairing_flow(&server, &dir);
        flow.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_denied() {
        let server = MockServer::start().await;
        mount_track(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v4/login/authorize/101"))
            .respond_with(status_reply("denied"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (flow, _) = pairing_flow(&server, &dir);
        let err = flow.run().await.unwrap_err();
        assert_eq!(err.to_string(), "the user denied the authorization request");
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        mount_track(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v4/login/authorize/101"))
            .respond_with(status_reply("timeout"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (flow, _) = pairing_flow(&server, &dir);
        let err = flow.run().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "the user did not confirm the authorization within the given time"
        );
    }

    #[tokio::test]
    async fn test_unknown_means_revoked() {
        let server = MockServer::start().await;
        mount_track(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v4/login/authorize/101"))
            .respond_with(status_reply("unknown"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (flow, _) = pairing_flow(&server, &dir);
        assert!(matches!(flow.run().await, Err(AuthError::PairingRevoked)));
    }

    #[tokio::test]
    async fn test_exhausted_attempts_fall_through() {
        let server = MockServer::start().await;
        mount_track(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v4/login/authorize/101"))
            .respond_with(status_reply("pending"))
            .expect(3)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (flow, _) = pairing_flow(&server, &dir);
        let token = flow.with_max_attempts(3).run().await.unwrap();
        assert_eq!(token.as_str(), "IOI");
    }

    #[tokio::test]
    async fn test_cancelled_while_pending() {
        let server = MockServer::start().await;
        mount_track(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v4/login/authorize/101"))
            .respond_with(status_reply("pending"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (flow, _) = pairing_flow(&server, &dir);
        let cancel = CancellationToken::new();
        let flow = flow
            .with_poll_interval(Duration::from_secs(60))
            .with_cancellation(cancel.clone());

        let handle = tokio::spawn(async move { flow.run().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(AuthError::Cancelled)));
    }

    #[tokio::test]
    async fn test_pairing_request_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/login/authorize/"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "success": false,
                "error_code": "new_apps_denied",
                "msg": "New application token request has been disabled"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (flow, store) = pairing_flow(&server, &dir);
        let err = flow.run().await.unwrap_err();
        assert!(matches!(err, AuthError::PairingRequest(ref code) if code == "new_apps_denied"));
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn test_status_reply_without_result() {
        let server = MockServer::start().await;
        mount_track(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/v4/login/authorize/101"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "msg": "Unknown track id"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let (flow, _) = pairing_flow(&server, &dir);
        let err = flow.run().await.unwrap_err();
        assert!(matches!(err, AuthError::PairingRequest(ref msg) if msg == "no status in reply: Unknown track id"));
    }

    #[test]
    fn test_no_confirmation() {
        assert!(NoConfirmation.confirm(CONFIRMATION_PROMPT).is_ok());
    }
}
