use serde::{Deserialize, Serialize};

/// One entry of `GET wifi/ap/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiAccessPoint {
    pub id: u32,
    pub name: String,
}

/// One entry of `GET wifi/ap/{id}/stations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiStation {
    pub hostname: String,
    pub mac: String,
    pub state: String,
    pub inactive: i64,
    pub rx_bytes: i64,
    pub tx_bytes: i64,
    #[serde(rename = "conn_duration")]
    pub connection_duration: i64,
    pub tx_rate: i64,
    pub rx_rate: i64,
    pub signal: i64,
}
