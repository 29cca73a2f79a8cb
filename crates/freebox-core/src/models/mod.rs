//! Data models for the Freebox local API.
//!
//! Every response from the box is wrapped in the same envelope
//! (`success`, `result`, `error_code`, `msg`); the payload types live in the
//! submodules:
//!
//! - `login`: challenge, pairing and session payloads
//! - `system`: temperatures, fan speed, uptime
//! - `lan`: hosts seen by the LAN browser
//! - `rrd`: time-series counters (dsl, temp, net, switch)
//! - `connection`: xDSL line state and freeplug (PLC) networks
//! - `wifi`: access points and their stations
//! - `vpn`: VPN server connections

pub mod connection;
pub mod envelope;
pub mod lan;
pub mod login;
pub mod rrd;
pub mod system;
pub mod vpn;
pub mod wifi;

pub use connection::{ConnectionXdsl, FreeplugMember, FreeplugNetwork, XdslLineStats, XdslStatus};
pub use envelope::ApiResponse;
pub use lan::{LanHost, LanL3Connectivity};
pub use login::{
    AuthorizeRequest, AuthorizeStatus, ChallengeResult, PairingStatus, SessionRequest,
    SessionResult, TrackResult,
};
pub use rrd::{RrdQuery, RrdResult, RrdRow};
pub use system::SystemStatus;
pub use vpn::VpnConnection;
pub use wifi::{WifiAccessPoint, WifiStation};
