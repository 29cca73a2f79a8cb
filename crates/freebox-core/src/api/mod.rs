//! REST API client module for the Freebox local API.
//!
//! This module provides the `ApiClient` used by every collector. Requests are
//! signed with the session token from `SessionManager` (header
//! `X-Fbx-App-Auth`); an `auth_required` reply triggers one session renewal
//! and one retry.

pub mod client;
pub mod error;

pub use client::{ApiClient, SignedRequest, AUTH_HEADER};
pub use error::ApiError;
