use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sampling precision requested from the RRD endpoint.
pub const RRD_PRECISION: u32 = 10;

/// How far back (seconds) each RRD query looks.
pub const RRD_LOOKBACK_SECS: i64 = 10;

/// `POST rrd/` body.
#[derive(Debug, Clone, Serialize)]
pub struct RrdQuery {
    pub db: String,
    pub fields: Vec<String>,
    pub precision: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_end: Option<i64>,
}

impl RrdQuery {
    /// Query the last few seconds of `db`, relative to `now` (unix seconds).
    pub fn recent(db: &str, fields: &[&str], now: i64) -> Self {
        Self {
            db: db.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            precision: RRD_PRECISION,
            date_start: Some(now - RRD_LOOKBACK_SECS),
            date_end: None,
        }
    }
}

/// One sample row: field name to value. `time` is included by the box.
pub type RrdRow = BTreeMap<String, i64>;

/// `POST rrd/` payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RrdResult {
    pub date_start: Option<i64>,
    pub date_end: Option<i64>,
    pub data: Vec<RrdRow>,
}

impl RrdResult {
    /// The first sample, restricted to the requested fields.
    /// Missing fields are reported as 0, matching how the box omits idle counters.
    pub fn first_row(&self, fields: &[&str]) -> Option<RrdRow> {
        let row = self.data.first()?;
        Some(
            fields
                .iter()
                .map(|f| (f.to_string(), row.get(*f).copied().unwrap_or(0)))
                .collect(),
        )
    }
}
