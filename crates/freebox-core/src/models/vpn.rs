use serde::{Deserialize, Serialize};

/// One entry of `GET vpn/connection/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VpnConnection {
    pub id: String,
    pub user: String,
    pub vpn: String,
    pub src_ip: String,
    pub local_ip: String,
    pub rx_bytes: i64,
    pub tx_bytes: i64,
    pub auth_time: i64,
}
