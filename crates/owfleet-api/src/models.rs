// Cloud SDK wire types
//
// Models for the gateway (owgw) and provisioning (owprov) JSON payloads.
// Fields carry `#[serde(default)]` because devices report different subsets
// depending on firmware. Metrics that are copied straight into reports stay
// as `serde_json::Value` so their JSON type survives untouched; fields that
// feed arithmetic are typed.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ── Envelopes ────────────────────────────────────────────────────────

/// Response to any `countOnly=true` query.
#[derive(Debug, Clone, Deserialize)]
pub struct CountResponse {
    #[serde(default)]
    pub count: Option<u64>,
}

/// `POST /api/v1/oauth2` response. Only the token is used.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceListEnvelope {
    #[serde(default, rename = "devicesWithStatus")]
    pub devices: Option<Vec<RawDevice>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InventoryEnvelope {
    #[serde(default)]
    pub taglist: Option<Vec<InventoryRecord>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VenueEnvelope {
    #[serde(default)]
    pub venues: Option<Vec<Venue>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EntityEnvelope {
    #[serde(default)]
    pub entities: Option<Vec<Entity>>,
}

/// `GET /api/v1/devices?connectionStatistics=true`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatistics {
    #[serde(default)]
    pub connected_devices: u64,
    #[serde(default)]
    pub average_connection_time: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Devices ──────────────────────────────────────────────────────────

/// One access point as listed by `devicesWithStatus`.
///
/// Round-trips through the `Devices` disk cache, so unknown fields are kept
/// in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDevice {
    #[serde(rename = "serialNumber")]
    pub serial_number: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub compatible: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub firmware: String,
    #[serde(default, rename = "associations_2G")]
    pub associations_2g: u64,
    #[serde(default, rename = "associations_5G")]
    pub associations_5g: u64,
    #[serde(default, rename = "associations_6G")]
    pub associations_6g: u64,
    /// Raw configuration document. Parsed on demand by [`RawDevice::configuration`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawDevice {
    /// The typed configuration, or `None` when absent or malformed.
    pub fn configuration(&self) -> Option<DeviceConfiguration> {
        self.configuration
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// The subset of a device's pushed configuration inspected by health checks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceConfiguration {
    #[serde(default)]
    pub radios: Vec<ConfiguredRadio>,
    #[serde(default)]
    pub interfaces: Vec<ConfiguredInterface>,
    #[serde(default)]
    pub services: Option<ConfiguredServices>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfiguredRadio {
    #[serde(default)]
    pub band: String,
    #[serde(default)]
    pub channel: Option<Value>,
    #[serde(default, rename = "channel-width")]
    pub channel_width: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfiguredInterface {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ethernet: Vec<EthernetSelection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EthernetSelection {
    #[serde(default, rename = "select-ports")]
    pub select_ports: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfiguredServices {
    #[serde(default)]
    pub log: Option<LogService>,
}

/// Remote syslog target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogService {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

// ── Device statistics ────────────────────────────────────────────────

/// Last state message of one device (`statistics?lastOnly=true`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceStatistics {
    #[serde(default)]
    pub unit: Option<UnitStats>,
    #[serde(default)]
    pub interfaces: Option<Vec<InterfaceStats>>,
    #[serde(default, deserialize_with = "null_default")]
    pub radios: Vec<RadioStats>,
    #[serde(default, rename = "rrm-info", deserialize_with = "null_default")]
    pub rrm_info: Vec<RrmInfo>,
    #[serde(default, rename = "link-state")]
    pub link_state: Option<LinkState>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitStats {
    /// Device clock, seconds since the epoch.
    #[serde(default)]
    pub localtime: Option<i64>,
    #[serde(default)]
    pub uptime: Option<i64>,
    #[serde(default)]
    pub cpu_load: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "null_default")]
    pub load: Vec<Value>,
    #[serde(default)]
    pub memory: Option<MemoryStats>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MemoryStats {
    #[serde(default, deserialize_with = "null_default")]
    pub free: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub total: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfaceStats {
    #[serde(default)]
    pub name: Option<String>,
    /// Static VLAN of the logical interface.
    #[serde(default)]
    pub vlan_id: Option<i64>,
    #[serde(default)]
    pub ssids: Option<Vec<SsidStats>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SsidStats {
    #[serde(default, deserialize_with = "null_default")]
    pub band: String,
    #[serde(default, deserialize_with = "null_default")]
    pub ssid: String,
    #[serde(default)]
    pub associations: Option<Vec<Association>>,
}

/// One station associated to an SSID.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Association {
    pub station: String,
    /// Seconds the station has been associated.
    #[serde(default, deserialize_with = "null_default")]
    pub connected: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub rssi: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub ack_signal_avg: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub rx_packets: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub rx_bytes: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub tx_packets: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub tx_bytes: u64,
    #[serde(default)]
    pub rx_rate: Option<Rate>,
    #[serde(default)]
    pub tx_rate: Option<Rate>,
    #[serde(default)]
    pub dynamic_vlan: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Rate {
    /// Kbit/s.
    #[serde(default)]
    pub bitrate: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RadioStats {
    /// Reported as a list (`["5G"]`) by current firmware, a bare string by older.
    #[serde(default, deserialize_with = "one_or_many")]
    pub band: Vec<String>,
    #[serde(default)]
    pub channel: Value,
    #[serde(default)]
    pub channel_width: Value,
    #[serde(default, deserialize_with = "null_default")]
    pub survey: Vec<SurveyEntry>,
    /// SSID → neighbors seen broadcasting it.
    #[serde(default, deserialize_with = "null_default")]
    pub neighbors: IndexMap<String, Vec<Neighbor>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurveyEntry {
    #[serde(default, rename = "on-chan")]
    pub on_chan: Value,
    #[serde(default)]
    pub channel: Value,
    #[serde(default)]
    pub noise_floor: Value,
    #[serde(default)]
    pub active_ms: Value,
    #[serde(default)]
    pub busy_ms: Value,
    #[serde(default)]
    pub busy_self_ms: Value,
    #[serde(default)]
    pub busy_tx_ms: Value,
    #[serde(default)]
    pub last_on_chan_secs_go: Value,
    #[serde(default)]
    pub rrm_airtime_pct: Value,
    /// Absent on firmware that still reports the old survey format.
    #[serde(default)]
    pub agg_15m: Option<SurveyAggregate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SurveyAggregate {
    #[serde(default)]
    pub active_ms: Value,
    #[serde(default)]
    pub busy_ms: Value,
    #[serde(default)]
    pub busy_self_ms: Value,
    #[serde(default)]
    pub busy_tx_ms: Value,
    #[serde(default)]
    pub num_samples: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Neighbor {
    #[serde(default)]
    pub bssid: Option<String>,
    #[serde(default)]
    pub in_network: Option<bool>,
    #[serde(default)]
    pub channel: Value,
    #[serde(default)]
    pub rssi: Value,
    #[serde(default)]
    pub last_seen_secs_ago: Value,
}

/// Per-client steering report from the RRM agent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RrmInfo {
    pub mac: String,
    /// Index into the RRM state table; `null` means no report.
    #[serde(default)]
    pub state: Option<i64>,
    #[serde(default)]
    pub supported_bands: Value,
    #[serde(default, deserialize_with = "null_default")]
    pub active: bool,
    #[serde(default)]
    pub pps_rx: Value,
    #[serde(default, deserialize_with = "null_default")]
    pub stats: SteeringStats,
    #[serde(default, deserialize_with = "null_default")]
    pub wnm: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub rrm: RrmCapabilities,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SteeringStats {
    #[serde(default, deserialize_with = "null_default")]
    pub upsteer: SteeringKinds,
    #[serde(default, deserialize_with = "null_default")]
    pub sticky: SteeringKinds,
    #[serde(default, deserialize_with = "null_default")]
    pub downsteer: SteeringKinds,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SteeringKinds {
    #[serde(default, deserialize_with = "null_default")]
    pub btm: SteeringOutcomes,
    #[serde(default, deserialize_with = "null_default")]
    pub legacy: SteeringOutcomes,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SteeringOutcomes {
    #[serde(default, deserialize_with = "null_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub success: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub fail: u64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RrmCapabilities {
    #[serde(default, deserialize_with = "null_default")]
    pub beacon_active_measure: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub beacon_passive_measure: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub beacon_table_measure: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub link_measure: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub statistics_measure: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkState {
    #[serde(default)]
    pub upstream: Option<UpstreamLinks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamLinks {
    #[serde(default, rename = "WAN")]
    pub wan: Option<PortLink>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortLink {
    #[serde(default)]
    pub carrier: Value,
    #[serde(default)]
    pub speed: Value,
    #[serde(default)]
    pub duplex: Value,
}

/// Statistics body plus the size it had on the wire.
#[derive(Debug, Clone)]
pub struct StatisticsPayload {
    /// Length of the undecoded body in bytes.
    pub bytes: usize,
    pub stats: DeviceStatistics,
}

// ── Provisioning ─────────────────────────────────────────────────────

/// One `taglist` entry of the provisioning inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub device_type: String,
    /// Venue id. May be present but empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Owning entity id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Commands ─────────────────────────────────────────────────────────

/// Body of `POST /api/v1/device/{mac}/script`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRequest<'a> {
    pub serial_number: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Base64-encoded script body.
    pub script: &'a str,
    pub when: u64,
    pub deferred: bool,
}

/// Body of `POST /api/v1/device/{mac}/upgrade`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest<'a> {
    pub serial_number: &'a str,
    pub uri: &'a str,
    pub when: u64,
    pub keep_redirector: bool,
}

/// Reply to a script or upgrade request.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandReply {
    #[serde(default, rename = "UUID")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub results: Option<CommandResults>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandResults {
    #[serde(default)]
    pub status: Option<CommandStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandStatus {
    #[serde(default, rename = "resultCode")]
    pub result_code: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /api/v1/command/{uuid}`: the tracked state of a queued command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDetails {
    #[serde(default, rename = "UUID")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "errorCode")]
    pub error_code: Option<i64>,
    #[serde(default, rename = "errorText")]
    pub error_text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Helpers ──────────────────────────────────────────────────────────

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(()) => Vec::new(),
    })
}

/// `null` decodes as the type's default, same as a missing key.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
