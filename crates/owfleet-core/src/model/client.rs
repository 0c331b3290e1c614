// ── Wireless clients ──
//
// A client as seen by one AP (`ApClient`), its per-AP output row
// (`ClientSighting`), and its canonical cross-AP view (`AggregatedClient`).

use std::ops::AddAssign;

use owfleet_api::models::{RrmCapabilities, SteeringOutcomes, SteeringStats};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use strum::{Display, FromRepr};

use super::{ApIdentity, DeviceRef, MacAddress};

// ── RRM state ───────────────────────────────────────────────────────

/// Steering state reported by the RRM agent, by table position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RrmState {
    Invalid = 0,
    CanSteer = 1,
    Steering = 2,
    Backoff = 3,
    Disabled = 4,
    MaxReached = 5,
}

impl RrmState {
    /// Render a wire state code. Codes naming a real state (`1..=5`) render
    /// as the state name; `0` and unknown codes render as the number.
    pub fn label(code: i64) -> String {
        u8::try_from(code)
            .ok()
            .filter(|c| *c >= 1)
            .and_then(Self::from_repr)
            .map_or_else(|| code.to_string(), |state| state.to_string())
    }
}

// ── Steering counters ───────────────────────────────────────────────

const STEER_TYPES: [&str; 3] = ["upsteer", "sticky", "downsteer"];
const STEER_KINDS: [&str; 2] = ["btm", "legacy"];
const STEER_OUTCOMES: [&str; 3] = ["total", "success", "fail"];

/// Column names of the 18 steering counters, in output order.
pub fn steering_columns() -> impl Iterator<Item = String> {
    STEER_TYPES.iter().flat_map(|st| {
        STEER_KINDS.iter().flat_map(move |kt| {
            STEER_OUTCOMES
                .iter()
                .map(move |sn| format!("rrm_{st}_{kt}_{sn}"))
        })
    })
}

/// `{upsteer,sticky,downsteer} × {btm,legacy} × {total,success,fail}`,
/// flattened in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SteeringCounters([u64; 18]);

impl SteeringCounters {
    pub fn values(&self) -> &[u64; 18] {
        &self.0
    }
}

impl From<&SteeringStats> for SteeringCounters {
    fn from(stats: &SteeringStats) -> Self {
        let mut out = [0_u64; 18];
        let outcomes = [stats.upsteer, stats.sticky, stats.downsteer]
            .into_iter()
            .flat_map(|kinds| [kinds.btm, kinds.legacy])
            .flat_map(|o: SteeringOutcomes| [o.total, o.success, o.fail]);
        for (slot, value) in out.iter_mut().zip(outcomes) {
            *slot = value;
        }
        Self(out)
    }
}

impl AddAssign<&SteeringCounters> for SteeringCounters {
    fn add_assign(&mut self, rhs: &SteeringCounters) {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a = a.saturating_add(*b);
        }
    }
}

impl Serialize for SteeringCounters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (column, value) in steering_columns().zip(self.0.iter()) {
            map.serialize_entry(&column, value)?;
        }
        map.end()
    }
}

/// Client radio-measurement capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RrmCapabilityFlags {
    #[serde(rename = "rrm_cap_wnm")]
    pub wnm: bool,
    #[serde(rename = "rrm_cap_active")]
    pub active: bool,
    #[serde(rename = "rrm_cap_passive")]
    pub passive: bool,
    #[serde(rename = "rrm_cap_table")]
    pub table: bool,
    #[serde(rename = "rrm_cap_link")]
    pub link: bool,
    #[serde(rename = "rrm_cap_stats")]
    pub stats: bool,
}

impl RrmCapabilityFlags {
    pub fn new(wnm: bool, caps: &RrmCapabilities) -> Self {
        Self {
            wnm,
            active: caps.beacon_active_measure,
            passive: caps.beacon_passive_measure,
            table: caps.beacon_table_measure,
            link: caps.link_measure,
            stats: caps.statistics_measure,
        }
    }
}

// ── Per-AP client view ──────────────────────────────────────────────

/// Connection state and RRM data for a client on one AP.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientMetrics {
    pub connected: bool,
    pub band: String,
    pub ssid: String,
    /// Seconds since association; smaller is more recent.
    pub connected_time: i64,
    pub rssi: i64,
    pub avg_ack_rssi: i64,
    /// Mbit/s.
    pub rx_rate: f64,
    pub tx_rate: f64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    /// `D-<n>` for a dynamic VLAN, `S-<n>` for a static one, else empty.
    pub vlan_id: String,
    pub rrm_state: String,
    pub rrm_bands: Value,
    pub rrm_active: bool,
    pub rrm_pps: Value,
    #[serde(flatten)]
    pub steering: SteeringCounters,
    #[serde(flatten)]
    pub capabilities: RrmCapabilityFlags,
}

impl Default for ClientMetrics {
    /// A client known only from an RRM report.
    fn default() -> Self {
        Self {
            connected: false,
            band: String::new(),
            ssid: String::new(),
            connected_time: 0,
            rssi: 0,
            avg_ack_rssi: 0,
            rx_rate: 0.0,
            tx_rate: 0.0,
            rx_packets: 0,
            rx_bytes: 0,
            tx_packets: 0,
            tx_bytes: 0,
            vlan_id: String::new(),
            rrm_state: "N/A".into(),
            rrm_bands: Value::from(0),
            rrm_active: false,
            rrm_pps: Value::from(0),
            steering: SteeringCounters::default(),
            capabilities: RrmCapabilityFlags::default(),
        }
    }
}

/// One client as seen by one AP.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApClient {
    #[serde(flatten)]
    pub owner: ApIdentity,
    #[serde(flatten)]
    pub metrics: ClientMetrics,
    /// Relation to the owning device in the run's device table.
    #[serde(skip)]
    pub device: DeviceRef,
}

/// Row of the clients-by-ap table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSighting {
    pub mac: MacAddress,
    #[serde(flatten)]
    pub client: ApClient,
}

/// Row of the clients table: one client across every AP that reported it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedClient {
    pub mac: MacAddress,
    pub org: String,
    pub venue: String,
    /// Number of APs reporting this client.
    pub ap_cnt: usize,
    /// Duplicate associations seen on a single AP.
    pub dups: u64,
    #[serde(flatten)]
    pub metrics: ClientMetrics,
}
