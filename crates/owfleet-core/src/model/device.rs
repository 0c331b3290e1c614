// ── Normalized access point ──
//
// One row of the online-devices table, built once per connected device per
// run and never mutated after its loop step.

use serde::{Serialize, Serializer};
use serde_json::Value;
use strum::{Display, EnumString};

use super::MacAddress;

/// Value of the unit-derived float columns when the device sent no `unit`.
pub const NO_UNIT: f64 = -1.0;

/// Index of a device in the run's device table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceRef(pub usize);

/// Radio band, as reported in survey and neighbor rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Band {
    #[serde(rename = "2g")]
    #[strum(serialize = "2g")]
    TwoG,
    #[serde(rename = "5g")]
    #[strum(serialize = "5g")]
    FiveG,
    #[serde(rename = "6g")]
    #[strum(serialize = "6g")]
    SixG,
}

/// Identity columns shared by every per-device row (survey, neighbors).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceLabel {
    pub mac: MacAddress,
    pub name: String,
    pub venue: String,
    pub org: String,
    pub model: String,
    pub firmware: String,
}

/// One connected access point. Field order is the JSON key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDevice {
    pub mac: MacAddress,
    pub name: String,
    pub org: String,
    pub venue: String,
    pub model: String,
    pub firmware: String,
    pub uptime: i64,
    #[serde(serialize_with = "sentinel_or_float")]
    pub up_days: f64,
    pub cpu_busy_pct: Value,
    pub cpu_load_1m: Value,
    pub cpu_load_5m: Value,
    pub cpu_load_15m: Value,
    #[serde(serialize_with = "sentinel_or_float")]
    pub mem_used_pct: f64,
    #[serde(serialize_with = "sentinel_or_float")]
    pub mem_free_pct: f64,
    pub num_ifaces: usize,
    pub num_ssids: usize,
    pub num_assocs: u64,
    pub chan_2g: Value,
    pub width_2g: Value,
    pub chan_5g: Value,
    pub width_5g: Value,
    pub chan_6g: Value,
    pub width_6g: Value,
    pub conf_2g: String,
    pub conf_5g: String,
    pub conf_6g: String,
    pub conf_2g_bw: String,
    pub conf_5g_bw: String,
    pub conf_6g_bw: String,
    /// Seconds since the device's own clock stamped its last state; -1 if unknown.
    pub last_state: i64,
    pub wan_carrier: Value,
    pub wan_speed: Value,
    pub wan_duplex: Value,
}

impl NormalizedDevice {
    pub fn label(&self) -> DeviceLabel {
        DeviceLabel {
            mac: self.mac.clone(),
            name: self.name.clone(),
            venue: self.venue.clone(),
            org: self.org.clone(),
            model: self.model.clone(),
            firmware: self.firmware.clone(),
        }
    }

    /// The identity copied into every client record this AP reports.
    pub fn ap_identity(&self) -> ApIdentity {
        ApIdentity {
            org: self.org.clone(),
            venue: self.venue.clone(),
            ap_mac: self.mac.clone(),
            ap_name: self.name.clone(),
            ap_model: self.model.clone(),
            ap_fw: self.firmware.clone(),
        }
    }
}

/// Percentages and day counts are floats, except the `-1` written when the
/// device sent no unit stats.
fn sentinel_or_float<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if (*value - NO_UNIT).abs() < f64::EPSILON {
        serializer.serialize_i64(-1)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Owning access point of a client record, copied at record creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApIdentity {
    pub org: String,
    pub venue: String,
    pub ap_mac: MacAddress,
    pub ap_name: String,
    pub ap_model: String,
    pub ap_fw: String,
}
