//! Application configuration management.
//!
//! Configuration comes from the environment (a `.env` file is loaded by the
//! binary before this runs). Every setting has a default, so a bare
//! `freebox-exporter` talks to `http://mafreebox.freebox.fr/` and keeps its
//! app token in `~/.freebox_token`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::auth::DeviceIdentity;

/// Default vendor endpoint, reachable from any host on the box's LAN
const DEFAULT_ENDPOINT: &str = "http://mafreebox.freebox.fr/";

/// API version used for login and most data endpoints
const DEFAULT_API_VERSION: &str = "v4";

/// Wi-Fi endpoints are only exposed under the older API version
const WIFI_API_VERSION: &str = "v2";

/// Credential file name in the user's home directory
const TOKEN_FILE: &str = ".freebox_token";

/// Seconds between two collection cycles.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// HTTP request timeout in seconds.
/// The box answers in milliseconds on a LAN; 10s still tolerates a busy box.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const APP_ID: &str = "fr.freebox.exporter";
pub const APP_NAME: &str = "prometheus-exporter";
pub const DEVICE_NAME: &str = "local";

/// URLs of every endpoint the exporter calls, derived from one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
    version: String,
}

impl Endpoints {
    /// `base` may be given with or without its trailing slash.
    pub fn new(base: &str, version: &str) -> Self {
        let mut base = base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self {
            base,
            version: version.trim_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `{base}api/{version}/{path}`
    pub fn api(&self, path: &str) -> String {
        format!("{}api/{}/{}", self.base, self.version, path.trim_start_matches('/'))
    }

    /// Same as [`Endpoints::api`] but pinned to the Wi-Fi API version.
    pub fn wifi(&self, path: &str) -> String {
        format!("{}api/{}/{}", self.base, WIFI_API_VERSION, path.trim_start_matches('/'))
    }

    pub fn login(&self) -> String {
        self.api("login/")
    }

    pub fn authorize(&self) -> String {
        self.api("login/authorize/")
    }

    /// Pairing status for one track id: `{authorize}{track_id}`.
    pub fn authorize_status(&self, track_id: u64) -> String {
        format!("{}{}", self.authorize(), track_id)
    }

    pub fn session(&self) -> String {
        self.api("login/session/")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoints: Endpoints,
    pub token_path: PathBuf,
    pub identity: DeviceIdentity,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Fibre boxes have no DSL line; skip those collectors.
    pub fiber: bool,
    pub debug: bool,
}

impl Config {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let endpoint = get("ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let version = get("API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let token_path = match get("FREEBOX_TOKEN_PATH") {
            Some(path) => PathBuf::from(path),
            None => Self::default_token_path()?,
        };

        let poll_interval = Self::parse_secs(get("POLL_INTERVAL_SECS"), DEFAULT_POLL_INTERVAL_SECS)
            .context("Invalid POLL_INTERVAL_SECS")?;
        let request_timeout =
            Self::parse_secs(get("REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS)
                .context("Invalid REQUEST_TIMEOUT_SECS")?;

        Ok(Self {
            endpoints: Endpoints::new(&endpoint, &version),
            token_path,
            identity: DeviceIdentity::default(),
            poll_interval,
            request_timeout,
            // Any non-empty value turns a flag on
            fiber: get("FIBER").is_some(),
            debug: get("DEBUG").is_some(),
        })
    }

    fn parse_secs(value: Option<String>, default: u64) -> Result<Duration> {
        let secs = match value {
            Some(v) => v.trim().parse::<u64>()?,
            None => default,
        };
        if secs == 0 {
            anyhow::bail!("must be at least 1 second");
        }
        Ok(Duration::from_secs(secs))
    }

    fn default_token_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory; set FREEBOX_TOKEN_PATH"))?;
        Ok(home.join(TOKEN_FILE))
    }
}
