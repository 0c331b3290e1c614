// ── Survey and neighbor rows ──

use serde::Serialize;
use serde_json::Value;

use super::{Band, DeviceLabel};

/// One channel-survey entry from one radio of one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyRecord {
    #[serde(flatten)]
    pub device: DeviceLabel,
    pub band: Band,
    /// Passed through; `"unknown"` when the entry omits it.
    #[serde(rename = "on-chan")]
    pub on_chan: Value,
    pub channel: Value,
    pub noise_floor: Value,
    pub active_ms: Value,
    pub busy_ms: Value,
    pub busy_self_ms: Value,
    pub busy_tx_ms: Value,
    pub last_on_chan_secs_go: Value,
    pub rrm_airtime_pct: Value,
    pub agg_15m_active_ms: Value,
    pub agg_15m_busy_ms: Value,
    pub agg_15m_busy_self_ms: Value,
    pub agg_15m_busy_tx_ms: Value,
    pub agg_15m_num_samples: Value,
}

/// One neighboring BSS heard on one radio, grouped by the SSID it broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborRecord {
    #[serde(flatten)]
    pub device: DeviceLabel,
    pub band: Band,
    pub ssid: String,
    pub bssid: String,
    pub in_network: bool,
    pub channel: Value,
    pub rssi: Value,
    pub last_seen_secs_ago: Value,
}
