//! Core library for freebox-exporter.
//!
//! Everything that talks to the Freebox local API lives here:
//!
//! - `auth`: app pairing, the persisted app token and session derivation
//! - `api`: the signed request client used by every collector
//! - `models`: response envelopes and payload types
//! - `config`: environment-driven configuration and endpoint layout
//! - `poller`: one collection cycle and the fixed-cadence loop around it

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod poller;

pub use api::{ApiClient, ApiError, SignedRequest};
pub use auth::{
    AppToken, AuthError, ConfirmationGate, CredentialStore, DeviceIdentity, SessionManager,
    SessionToken,
};
pub use config::{Config, Endpoints};
pub use poller::{Poller, Snapshot};
