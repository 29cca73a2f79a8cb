//! Authentication module for the Freebox local API.
//!
//! This module provides:
//! - `CredentialStore`: the app token persisted once in a local file
//! - `ChallengeClient`: fetches the one-time login challenge
//! - `PairingFlow`: registers the app and waits for approval on the box
//! - `SessionManager`: derives, caches and renews the session token
//!
//! Pairing happens once per install; every later start loads the stored app
//! token and only derives a fresh session.

pub mod challenge;
pub mod credentials;
pub mod error;
pub mod pairing;
pub mod session;

pub use challenge::{Challenge, ChallengeClient};
pub use credentials::{AppToken, CredentialStore};
pub use error::AuthError;
pub use pairing::{
    ConfirmationGate, DeviceIdentity, NoConfirmation, PairingFlow, StdinConfirmation,
    PAIRING_MAX_ATTEMPTS,
};
pub use session::{hmac_sha1, SessionManager, SessionToken};
