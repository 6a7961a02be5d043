//! The KV-store record shapes: [`UeMetricsEntry`] and [`CellMetricsEntry`],
//! plus the `{TVsec, TVnsec}` timestamp pair they share.

use serde::{Deserialize, Serialize};

/// A POSIX-style (seconds, nanoseconds) timestamp, as carried verbatim from
/// the indication's RAN container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timestamp {
    #[serde(rename = "TVsec")]
    pub tv_sec: i64,
    #[serde(rename = "TVnsec")]
    pub tv_nsec: i64,
}

impl Timestamp {
    pub const fn new(tv_sec: i64, tv_nsec: i64) -> Self {
        Timestamp { tv_sec, tv_nsec }
    }
}

/// Per-UE record, keyed by the decimal string of the parsed C-RNTI.
///
/// Every field is read-modify-write: a field is only overwritten when the
/// indication that triggered the update actually carried it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UeMetricsEntry {
    #[serde(default)]
    pub serving_cell_id: String,
    #[serde(default)]
    pub meas_timestamp_pdcp_bytes: Timestamp,
    #[serde(default)]
    pub pdcp_bytes_dl: i64,
    #[serde(default)]
    pub pdcp_bytes_ul: i64,
    #[serde(default)]
    pub meas_timestamp_prb: Timestamp,
    #[serde(default)]
    pub prb_usage_dl: i64,
    #[serde(default)]
    pub prb_usage_ul: i64,
    #[serde(default)]
    pub meas_time_rf: Timestamp,
    /// Carried verbatim from the indication; opaque to the core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_cell_rf: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbor_cells_rf: Option<serde_json::Value>,
}

/// Per-cell record, keyed by the NR Cell Global Identifier string.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellMetricsEntry {
    #[serde(default)]
    pub meas_timestamp_pdcp_bytes: Timestamp,
    #[serde(default)]
    pub pdcp_bytes_dl: i64,
    #[serde(default)]
    pub pdcp_bytes_ul: i64,
    #[serde(default)]
    pub meas_timestamp_prb: Timestamp,
    #[serde(default)]
    pub avail_prb_dl: i64,
    #[serde(default)]
    pub avail_prb_ul: i64,
}
