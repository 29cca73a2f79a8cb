use serde::{Deserialize, Serialize};

/// `GET login/` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeResult {
    pub challenge: String,
    #[serde(default)]
    pub logged_in: Option<bool>,
}

/// `POST login/authorize/` body: the application identity being registered.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeRequest<'a> {
    pub app_id: &'a str,
    pub app_name: &'a str,
    pub app_version: &'a str,
    pub device_name: &'a str,
}

/// `POST login/authorize/` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackResult {
    #[serde(default)]
    pub app_token: String,
    pub track_id: u64,
}

/// Approval state of a pending app token, as reported by
/// `GET login/authorize/{track_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingStatus {
    Unknown,
    Pending,
    Timeout,
    Granted,
    Denied,
}

/// `GET login/authorize/{track_id}` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeStatus {
    pub status: PairingStatus,
    #[serde(default)]
    pub challenge: Option<String>,
}

/// `POST login/session/` body.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRequest<'a> {
    pub app_id: &'a str,
    pub password: &'a str,
}

/// `POST login/session/` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionResult {
    #[serde(default)]
    pub session_token: String,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub permissions: Option<serde_json::Map<String, serde_json::Value>>,
}

impl SessionResult {
    /// Permissions the box granted this app, sorted by name.
    pub fn granted_permissions(&self) -> Vec<&str> {
        let mut granted: Vec<&str> = self
            .permissions
            .iter()
            .flatten()
            .filter(|(_, v)| v.as_bool() == Some(true))
            .map(|(k, _)| k.as_str())
            .collect();
        granted.sort_unstable();
        granted
    }
}
