use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanL3Connectivity {
    pub addr: String,
    pub af: String,
    pub reachable: bool,
}

/// A host seen by `GET lan/browser/pub/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanHost {
    pub id: String,
    pub primary_name: String,
    pub vendor_name: String,
    pub reachable: bool,
    #[serde(rename = "l3connectivities")]
    pub l3_connectivities: Vec<LanL3Connectivity>,
}

impl LanHost {
    /// First layer-3 address, or an empty string when none is known.
    pub fn primary_ip(&self) -> &str {
        self.l3_connectivities
            .first()
            .map(|c| c.addr.as_str())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_ip() {
        let json = r#"[
            {"primary_name":"nas","vendor_name":"Synology","reachable":true,
             "l3connectivities":[{"addr":"192.168.1.10","af":"ipv4","reachable":true}]},
            {"primary_name":"phone","reachable":false}
        ]"#;
        let hosts: Vec<LanHost> = serde_json::from_str(json).expect("Failed to parse hosts");
        assert_eq!(hosts[0].primary_ip(), "192.168.1.10");
        assert_eq!(hosts[1].primary_ip(), "");
        assert!(!hosts[1].reachable);
    }
}
