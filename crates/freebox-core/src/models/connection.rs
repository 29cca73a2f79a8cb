use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct XdslStatus {
    pub status: String,
    pub modulation: String,
    pub protocol: String,
    pub uptime: i64,
}

/// Per-direction xDSL line statistics. `*_10` fields are in tenths of dB.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct XdslLineStats {
    pub attn: i64,
    pub attn_10: i64,
    pub snr: i64,
    pub snr_10: i64,
    pub rate: i64,
    pub maxrate: i64,
    pub crc: i64,
    pub es: i64,
    pub fec: i64,
    pub hec: i64,
    pub ses: i64,
    pub rtx_tx: i64,
    pub rtx_c: i64,
    pub rtx_uc: i64,
    pub nitro: bool,
    pub ginp: bool,
    pub phyr: bool,
}

impl XdslLineStats {
    pub fn attenuation_db(&self) -> f64 {
        self.attn_10 as f64 / 10.0
    }

    /// Signal/noise margin in dB. The box sometimes reports 0, which is not a
    /// real reading, so that case is `None`.
    pub fn snr_db(&self) -> Option<f64> {
        (self.snr_10 > 0).then(|| self.snr_10 as f64 / 10.0)
    }
}

/// `GET connection/xdsl/` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionXdsl {
    pub status: XdslStatus,
    pub down: XdslLineStats,
    pub up: XdslLineStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeplugMember {
    pub id: String,
    pub local: bool,
    pub net_role: String,
    pub eth_port_status: String,
    pub eth_full_duplex: bool,
    pub has_network: bool,
    pub eth_speed: i64,
    pub inactive: i64,
    pub net_id: String,
    /// Mb/s, -1 when unavailable.
    pub rx_rate: i64,
    /// Mb/s, -1 when unavailable.
    pub tx_rate: i64,
}

impl FreeplugMember {
    pub fn rx_bits_per_sec(&self) -> Option<f64> {
        (self.rx_rate >= 0).then(|| self.rx_rate as f64 * 1e6)
    }

    pub fn tx_bits_per_sec(&self) -> Option<f64> {
        (self.tx_rate >= 0).then(|| self.tx_rate as f64 * 1e6)
    }
}

/// One entry of `GET freeplug/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeplugNetwork {
    pub id: String,
    pub members: Vec<FreeplugMember>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_snr_is_ignored() {
        let json = r#"{"status":{"status":"showtime","modulation":"vdsl","protocol":"vdsl2_17a","uptime":86400},
            "down":{"attn_10":152,"snr_10":0,"nitro":true},
            "up":{"attn_10":80,"snr_10":61}}"#;
        let xdsl: ConnectionXdsl = serde_json::from_str(json).expect("Failed to parse xdsl");
        assert_eq!(xdsl.status.status, "showtime");
        assert_eq!(xdsl.down.attenuation_db(), 15.2);
        assert_eq!(xdsl.down.snr_db(), None);
        assert_eq!(xdsl.up.snr_db(), Some(6.1));
        assert!(xdsl.down.nitro);
    }

    #[test]
    fn test_freeplug_unavailable_rate() {
        let member = FreeplugMember {
            rx_rate: -1,
            tx_rate: 200,
            ..Default::default()
        };
        assert_eq!(member.rx_bits_per_sec(), None);
        assert_eq!(member.tx_bits_per_sec(), Some(200e6));
    }
}
