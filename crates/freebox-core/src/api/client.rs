//! API client for the Freebox local API.
//!
//! `ApiClient` turns a `SignedRequest` into a decoded payload, attaching the
//! session token and handling session expiry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::ApiError;
use crate::auth::{SessionManager, SessionToken};
use crate::models::{
    ApiResponse, ConnectionXdsl, FreeplugNetwork, LanHost, RrdQuery, RrdResult, RrdRow,
    SystemStatus, VpnConnection, WifiAccessPoint, WifiStation,
};

/// Header carrying the session token on every authenticated call
pub const AUTH_HEADER: &str = "X-Fbx-App-Auth";

/// A request to the box that still needs its session token attached.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

impl SignedRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
        }
    }

    pub fn post<B: Serialize>(url: impl Into<String>, body: &B) -> Result<Self, ApiError> {
        Ok(Self {
            method: Method::POST,
            url: url.into(),
            body: Some(serde_json::to_value(body)?),
        })
    }
}

enum Outcome<T> {
    Done(T),
    AuthRequired,
}

/// API client for the Freebox.
/// Clone is cheap - reqwest::Client and the session manager are both shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(client: Client, session: Arc<SessionManager>) -> Self {
        Self { client, session }
    }

    /// HTTP client shared by the auth flow and the collectors.
    pub fn http_client(timeout: Duration) -> Result<Client, ApiError> {
        Ok(Client::builder().timeout(timeout).build()?)
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send `request` with the current session token.
    ///
    /// When the box answers `auth_required` the session is renewed and the
    /// request retried once; a second refusal is returned as `AuthRequired`.
    pub async fn send<T>(&self, request: &SignedRequest) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
    {
        let token = self.session.ensure_token().await?;
        if let Outcome::Done(value) = self.send_once::<T>(request, &token).await? {
            return Ok(value);
        }

        info!(url = %request.url, "Session expired, renewing");
        let fresh = self.session.renew_stale(&token).await?;
        match self.send_once::<T>(request, &fresh).await? {
            Outcome::Done(value) => Ok(value),
            Outcome::AuthRequired => Err(ApiError::AuthRequired),
        }
    }

    async fn send_once<T>(
        &self,
        request: &SignedRequest,
        token: &SessionToken,
    ) -> Result<Outcome<T>, ApiError>
    where
        T: DeserializeOwned + Default,
    {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .header(AUTH_HEADER, token.as_str());
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!(url = %request.url, %status, "API response");

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(request.url.clone()));
        }

        let text = response.text().await?;
        let envelope: ApiResponse<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(ApiError::from_status(status, &text)),
            Err(e) => {
                return Err(ApiError::InvalidResponse(format!(
                    "Failed to parse JSON response from {}: {}",
                    request.url, e
                )))
            }
        };

        if let Some(code) = envelope.error_code() {
            let err = ApiError::from_error_code(code, envelope.message());
            if err.is_retryable_with_renew() {
                return Ok(Outcome::AuthRequired);
            }
            return Err(err);
        }

        if !envelope.success {
            return Err(ApiError::from_error_code("unknown", envelope.message()));
        }

        Ok(Outcome::Done(envelope.result.unwrap_or_default()))
    }

    // ===== Data Fetching Methods =====

    /// Temperatures, fan speed, uptime and firmware
    pub async fn fetch_system(&self) -> Result<SystemStatus, ApiError> {
        let url = self.session.endpoints().api("system/");
        self.send(&SignedRequest::get(url)).await
    }

    /// Hosts known to the LAN browser
    pub async fn fetch_lan_hosts(&self) -> Result<Vec<LanHost>, ApiError> {
        let url = self.session.endpoints().api("lan/browser/pub/");
        self.send(&SignedRequest::get(url)).await
    }

    /// Latest sample of `fields` from RRD database `db`
    pub async fn fetch_rrd(&self, db: &str, fields: &[&str]) -> Result<Option<RrdRow>, ApiError> {
        let url = self.session.endpoints().api("rrd/");
        let query = RrdQuery::recent(db, fields, Utc::now().timestamp());
        let result: RrdResult = self.send(&SignedRequest::post(url, &query)?).await?;
        Ok(result.first_row(fields))
    }

    pub async fn fetch_connection_xdsl(&self) -> Result<ConnectionXdsl, ApiError> {
        let url = self.session.endpoints().api("connection/xdsl/");
        self.send(&SignedRequest::get(url)).await
    }

    pub async fn fetch_freeplugs(&self) -> Result<Vec<FreeplugNetwork>, ApiError> {
        let url = self.session.endpoints().api("freeplug/");
        self.send(&SignedRequest::get(url)).await
    }

    pub async fn fetch_wifi_access_points(&self) -> Result<Vec<WifiAccessPoint>, ApiError> {
        let url = self.session.endpoints().wifi("wifi/ap/");
        self.send(&SignedRequest::get(url)).await
    }

    pub async fn fetch_wifi_stations(&self, ap_id: u32) -> Result<Vec<WifiStation>, ApiError> {
        let url = self.session.endpoints().wifi(&format!("wifi/ap/{}/stations", ap_id));
        self.send(&SignedRequest::get(url)).await
    }

    pub async fn fetch_vpn_connections(&self) -> Result<Vec<VpnConnection>, ApiError> {
        let url = self.session.endpoints().api("vpn/connection/");
        self.send(&SignedRequest::get(url)).await
    }
}
