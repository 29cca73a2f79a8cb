use serde::{Deserialize, Serialize};

/// `GET system/` payload. Temperatures are in °C, fan speed in RPM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    pub mac: String,
    pub fan_rpm: i64,
    pub box_flavor: String,
    pub temp_cpub: i64,
    pub temp_cpum: i64,
    pub temp_hdd: i64,
    pub temp_sw: i64,
    pub disk_status: String,
    pub board_name: String,
    pub uptime: String,
    pub uptime_val: i64,
    pub serial: String,
    pub firmware_version: String,
    pub box_authenticated: bool,
}

impl SystemStatus {
    /// Named temperature sensors, in a stable order.
    pub fn temperatures(&self) -> [(&'static str, i64); 4] {
        [
            ("cpu_b", self.temp_cpub),
            ("cpu_m", self.temp_cpum),
            ("switch", self.temp_sw),
            ("hdd", self.temp_hdd),
        ]
    }
}
