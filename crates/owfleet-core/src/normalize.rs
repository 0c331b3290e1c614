// ── Record normalizer ──
//
// Turns a listed device, its provisioning identity and its last state into
// the flat rows of the online-devices, survey and neighbor tables. Missing
// numeric metrics become -1 and missing names become "unknown".

use std::str::FromStr;

use indexmap::IndexMap;
use owfleet_api::models::{
    DeviceConfiguration, DeviceStatistics, Neighbor, RadioStats, RawDevice, SurveyEntry,
};
use serde_json::Value;

use crate::model::{
    Band, DeviceLabel, MacAddress, NO_UNIT, NeighborRecord, NormalizedDevice, SurveyRecord,
};
use crate::provisioning::{ProvData, UNKNOWN};

const SECS_PER_DAY: f64 = 86_400.0;

// ── Identity ────────────────────────────────────────────────────────

/// Name, model and hierarchy of a device as far as provisioning knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub mac: MacAddress,
    pub name: String,
    pub model: String,
    pub venue: String,
    pub org: String,
}

impl Identity {
    /// Resolve through inventory → venue → entity.
    ///
    /// Without an inventory record the model falls back to the device's
    /// `compatible` string when it reports a manufacturer. The venue id comes
    /// from inventory when it names one, else from the device listing.
    pub fn resolve(raw: &RawDevice, prov: &ProvData) -> Self {
        let mac = MacAddress::new(&raw.serial_number);
        let inv = prov.inventory_by_mac(&mac);

        let (name, model) = match inv {
            Some(inv) => (inv.name.clone(), inv.device_type.clone()),
            None if !raw.manufacturer.is_empty() => (UNKNOWN.into(), raw.compatible.clone()),
            None => (UNKNOWN.into(), UNKNOWN.into()),
        };

        let venue_id = inv
            .and_then(|i| i.venue.as_deref())
            .unwrap_or(&raw.venue);
        let (venue, org) = match prov.venue_by_uuid(venue_id) {
            Some(v) => {
                let org = v
                    .entity
                    .as_deref()
                    .and_then(|id| prov.entity_by_uuid(id))
                    .map_or_else(|| UNKNOWN.into(), |e| e.name.clone());
                (v.name.clone(), org)
            }
            None => (UNKNOWN.into(), UNKNOWN.into()),
        };

        Self {
            mac,
            name,
            model,
            venue,
            org,
        }
    }

    /// Case-insensitive org and venue filter. `None` matches anything.
    pub fn matches(&self, org: Option<&str>, venue: Option<&str>) -> bool {
        org.is_none_or(|o| self.org.eq_ignore_ascii_case(o))
            && venue.is_none_or(|v| self.venue.eq_ignore_ascii_case(v))
    }
}

/// Firmware string from `marker` onward; the whole string when the marker is
/// absent; "unknown" when empty.
pub fn firmware_label(firmware: &str, marker: &str) -> String {
    if firmware.is_empty() {
        return UNKNOWN.into();
    }
    match firmware.find(marker) {
        Some(idx) if !marker.is_empty() => firmware[idx..].to_owned(),
        _ => firmware.to_owned(),
    }
}

// ── Device row ──────────────────────────────────────────────────────

fn or_default(value: &Value, default: i64) -> Value {
    if value.is_null() {
        Value::from(default)
    } else {
        value.clone()
    }
}

fn nth_or(values: &[Value], idx: usize, default: i64) -> Value {
    values
        .get(idx)
        .map_or_else(|| Value::from(default), |v| or_default(v, default))
}

/// Render a configured setting as text; strings are used verbatim.
fn setting_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => UNKNOWN.into(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The band a radio reports first, if it is one we track.
pub fn radio_band(radio: &RadioStats) -> Option<Band> {
    radio.band.first().and_then(|b| Band::from_str(b).ok())
}

/// Build the online-devices row.
///
/// `now` is the run's reference time in Unix seconds; `last_state` is
/// measured against it.
pub fn normalize_device(
    raw: &RawDevice,
    identity: &Identity,
    config: Option<&DeviceConfiguration>,
    stats: &DeviceStatistics,
    now: i64,
    firmware_marker: &str,
) -> NormalizedDevice {
    let mut dev = NormalizedDevice {
        mac: identity.mac.clone(),
        name: identity.name.clone(),
        org: identity.org.clone(),
        venue: identity.venue.clone(),
        model: identity.model.clone(),
        firmware: firmware_label(&raw.firmware, firmware_marker),
        uptime: -1,
        up_days: NO_UNIT,
        cpu_busy_pct: Value::from(-1),
        cpu_load_1m: Value::from(-1),
        cpu_load_5m: Value::from(-1),
        cpu_load_15m: Value::from(-1),
        mem_used_pct: NO_UNIT,
        mem_free_pct: NO_UNIT,
        num_ifaces: 0,
        num_ssids: 0,
        num_assocs: raw.associations_2g + raw.associations_5g + raw.associations_6g,
        chan_2g: Value::from(0),
        width_2g: Value::from(0),
        chan_5g: Value::from(0),
        width_5g: Value::from(0),
        chan_6g: Value::from(0),
        width_6g: Value::from(0),
        conf_2g: UNKNOWN.into(),
        conf_5g: UNKNOWN.into(),
        conf_6g: UNKNOWN.into(),
        conf_2g_bw: UNKNOWN.into(),
        conf_5g_bw: UNKNOWN.into(),
        conf_6g_bw: UNKNOWN.into(),
        last_state: -1,
        wan_carrier: Value::from(-1),
        wan_speed: Value::from(-1),
        wan_duplex: Value::from(-1),
    };

    if let Some(config) = config {
        for radio in &config.radios {
            let channel = setting_text(radio.channel.as_ref());
            let width = setting_text(radio.channel_width.as_ref());
            match Band::from_str(&radio.band) {
                Ok(Band::TwoG) => (dev.conf_2g, dev.conf_2g_bw) = (channel, width),
                Ok(Band::FiveG) => (dev.conf_5g, dev.conf_5g_bw) = (channel, width),
                Ok(Band::SixG) => (dev.conf_6g, dev.conf_6g_bw) = (channel, width),
                Err(_) => {}
            }
        }
    }

    if let Some(unit) = &stats.unit {
        if let Some(localtime) = unit.localtime {
            dev.last_state = now - localtime;
        }
        if let Some(uptime) = unit.uptime {
            dev.uptime = uptime;
            #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
            let days = uptime as f64 / SECS_PER_DAY;
            dev.up_days = round2(days);
        }
        if let Some(cpu) = &unit.cpu_load {
            dev.cpu_busy_pct = nth_or(cpu, 0, -1);
        }
        dev.cpu_load_1m = nth_or(&unit.load, 0, -1);
        dev.cpu_load_5m = nth_or(&unit.load, 1, -1);
        dev.cpu_load_15m = nth_or(&unit.load, 2, -1);

        if let Some(mem) = unit.memory.filter(|m| m.total > 0) {
            #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
            let (total, free) = (mem.total as f64, mem.free as f64);
            dev.mem_used_pct = round2((total - free) * 100.0 / total);
            dev.mem_free_pct = round2(free * 100.0 / total);
        }
    }

    if let Some(interfaces) = &stats.interfaces {
        dev.num_ifaces = interfaces.len();
        dev.num_ssids = interfaces
            .iter()
            .filter_map(|i| i.ssids.as_ref())
            .map(Vec::len)
            .sum();
    }

    for radio in &stats.radios {
        let channel = or_default(&radio.channel, 0);
        let width = or_default(&radio.channel_width, 0);
        match radio_band(radio) {
            Some(Band::TwoG) => (dev.chan_2g, dev.width_2g) = (channel, width),
            Some(Band::FiveG) => (dev.chan_5g, dev.width_5g) = (channel, width),
            Some(Band::SixG) => (dev.chan_6g, dev.width_6g) = (channel, width),
            None => {}
        }
    }

    if let Some(wan) = stats
        .link_state
        .as_ref()
        .and_then(|l| l.upstream.as_ref())
        .and_then(|u| u.wan.as_ref())
    {
        dev.wan_carrier = or_default(&wan.carrier, -1);
        dev.wan_speed = or_default(&wan.speed, -1);
        dev.wan_duplex = or_default(&wan.duplex, -1);
    }

    dev
}

// ── Survey / neighbor rows ──────────────────────────────────────────

/// One row per survey entry. Entries in the pre-aggregate format (no
/// `agg_15m`) are skipped.
pub fn survey_rows(label: &DeviceLabel, band: Band, entries: &[SurveyEntry]) -> Vec<SurveyRecord> {
    entries
        .iter()
        .filter_map(|s| {
            let agg = s.agg_15m.as_ref()?;
            Some(SurveyRecord {
                device: label.clone(),
                band,
                on_chan: if s.on_chan.is_null() {
                    Value::from(UNKNOWN)
                } else {
                    s.on_chan.clone()
                },
                channel: or_default(&s.channel, -1),
                noise_floor: or_default(&s.noise_floor, -1),
                active_ms: or_default(&s.active_ms, -1),
                busy_ms: or_default(&s.busy_ms, -1),
                busy_self_ms: or_default(&s.busy_self_ms, -1),
                busy_tx_ms: or_default(&s.busy_tx_ms, -1),
                last_on_chan_secs_go: or_default(&s.last_on_chan_secs_go, -1),
                rrm_airtime_pct: or_default(&s.rrm_airtime_pct, -1),
                agg_15m_active_ms: or_default(&agg.active_ms, -1),
                agg_15m_busy_ms: or_default(&agg.busy_ms, -1),
                agg_15m_busy_self_ms: or_default(&agg.busy_self_ms, -1),
                agg_15m_busy_tx_ms: or_default(&agg.busy_tx_ms, -1),
                agg_15m_num_samples: or_default(&agg.num_samples, -1),
            })
        })
        .collect()
}

/// One row per (SSID, neighbor), in report order.
pub fn neighbor_rows(
    label: &DeviceLabel,
    band: Band,
    neighbors: &IndexMap<String, Vec<Neighbor>>,
) -> Vec<NeighborRecord> {
    neighbors
        .iter()
        .flat_map(|(ssid, list)| {
            list.iter().map(move |n| NeighborRecord {
                device: label.clone(),
                band,
                ssid: ssid.clone(),
                bssid: n.bssid.clone().unwrap_or_else(|| UNKNOWN.into()),
                in_network: n.in_network.unwrap_or(false),
                channel: or_default(&n.channel, -1),
                rssi: or_default(&n.rssi, -1),
                last_seen_secs_ago: or_default(&n.last_seen_secs_ago, -1),
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::provisioning::ProvCollections;

    fn prov() -> ProvData {
        ProvData::new(
            serde_json::from_value::<ProvCollections>(json!({
                "inventory": [
                    { "id": "i1", "serialNumber": "aa0000000001", "name": "lobby", "deviceType": "eap101", "venue": "v1" }
                ],
                "venues": [ { "id": "v1", "name": "HQ", "entity": "e1" },
                            { "id": "v2", "name": "Depot" } ],
                "entities": [ { "id": "e1", "name": "Acme" } ]
            }))
            .unwrap(),
        )
    }

    fn raw(value: Value) -> RawDevice {
        serde_json::from_value(value).unwrap()
    }

    fn stats(value: Value) -> DeviceStatistics {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn identity_from_inventory() {
        let dev = raw(json!({ "serialNumber": "AA0000000001", "venue": "v2" }));
        let id = Identity::resolve(&dev, &prov());
        assert_eq!(id.name, "lobby");
        assert_eq!(id.model, "eap101");
        assert_eq!(id.venue, "HQ");
        assert_eq!(id.org, "Acme");
        assert!(id.matches(Some("ACME"), Some("hq")));
        assert!(!id.matches(Some("Globex"), None));
    }

    #[test]
    fn identity_without_inventory() {
        let dev = raw(json!({
            "serialNumber": "bb0000000002",
            "manufacturer": "Edgecore",
            "compatible": "edgecore_eap102",
            "venue": "v2"
        }));
        let id = Identity::resolve(&dev, &prov());
        assert_eq!(id.name, "unknown");
        assert_eq!(id.model, "edgecore_eap102");
        assert_eq!(id.venue, "Depot");
        assert_eq!(id.org, "unknown");

        let bare = raw(json!({ "serialNumber": "bb0000000003" }));
        let id = Identity::resolve(&bare, &prov());
        assert_eq!(id.model, "unknown");
        assert_eq!(id.venue, "unknown");
    }

    #[test]
    fn firmware_trimmed_at_marker() {
        assert_eq!(
            firmware_label("TIP-v2.10.0-abc Shasta-2.10.0", "Shasta"),
            "Shasta-2.10.0"
        );
        assert_eq!(firmware_label("OpenWrt 21.02", "Shasta"), "OpenWrt 21.02");
        assert_eq!(firmware_label("", "Shasta"), "unknown");
    }

    #[test]
    fn device_without_unit_uses_sentinels() {
        let dev = raw(json!({
            "serialNumber": "aa0000000001",
            "associations_2G": 1, "associations_5G": 2, "associations_6G": 3
        }));
        let id = Identity::resolve(&dev, &prov());
        let nd = normalize_device(&dev, &id, None, &stats(json!({})), 1_700_000_000, "Shasta");

        assert_eq!(nd.num_assocs, 6);
        assert_eq!(nd.uptime, -1);
        assert_eq!(nd.last_state, -1);
        assert_eq!(nd.cpu_busy_pct, json!(-1));
        assert_eq!(nd.chan_5g, json!(0));
        assert_eq!(nd.conf_5g, "unknown");
        assert_eq!(nd.wan_speed, json!(-1));
        assert_eq!(nd.num_ifaces, 0);

        let row = serde_json::to_value(&nd).unwrap();
        assert_eq!(row["up_days"], json!(-1));
        assert_eq!(row["mem_used_pct"], json!(-1));
        assert_eq!(row["mem_free_pct"], json!(-1));
    }

    #[test]
    fn device_with_unit_and_radios() {
        let dev = raw(json!({
            "serialNumber": "aa0000000001",
            "firmware": "TIP Shasta-3.0",
            "configuration": {
                "radios": [
                    { "band": "5G", "channel": 36, "channel-width": 80 },
                    { "band": "2G", "channel": "auto", "channel-width": 20 }
                ]
            }
        }));
        let st = stats(json!({
            "unit": {
                "localtime": 1_699_999_700,
                "uptime": 172_800,
                "cpu_load": [12, 3, 4],
                "load": [0.5, 0.25, 0.125],
                "memory": { "free": 150, "total": 1000 }
            },
            "interfaces": [
                { "name": "up0v0", "ssids": [ { "ssid": "a" }, { "ssid": "b" } ] },
                { "name": "down1v0" }
            ],
            "radios": [ { "band": ["5G"], "channel": 36, "channel_width": "80" } ],
            "link-state": { "upstream": { "WAN": { "carrier": 1, "speed": 1000, "duplex": "full" } } }
        }));
        let id = Identity::resolve(&dev, &prov());
        let config = dev.configuration();
        let nd = normalize_device(&dev, &id, config.as_ref(), &st, 1_700_000_000, "Shasta");

        assert_eq!(nd.firmware, "Shasta-3.0");
        assert_eq!(nd.last_state, 300);
        assert_eq!(nd.uptime, 172_800);
        assert!((nd.up_days - 2.0).abs() < f64::EPSILON);
        assert_eq!(nd.cpu_busy_pct, json!(12));
        assert_eq!(nd.cpu_load_15m, json!(0.125));
        assert!((nd.mem_used_pct - 85.0).abs() < f64::EPSILON);
        assert!((nd.mem_free_pct - 15.0).abs() < f64::EPSILON);
        assert_eq!(nd.num_ifaces, 2);
        assert_eq!(nd.num_ssids, 2);
        assert_eq!(nd.chan_5g, json!(36));
        assert_eq!(nd.width_5g, json!("80"));
        assert_eq!(nd.conf_5g, "36");
        assert_eq!(nd.conf_5g_bw, "80");
        assert_eq!(nd.conf_2g, "auto");
        assert_eq!(nd.conf_6g, "unknown");
        assert_eq!(nd.wan_duplex, json!("full"));
    }

    fn label() -> DeviceLabel {
        DeviceLabel {
            mac: "aa0000000001".into(),
            name: "lobby".into(),
            venue: "HQ".into(),
            org: "Acme".into(),
            model: "eap101".into(),
            firmware: "Shasta-3.0".into(),
        }
    }

    #[test]
    fn survey_skips_old_format_and_defaults() {
        let entries: Vec<SurveyEntry> = serde_json::from_value(json!([
            { "channel": 36, "noise_floor": -95 },
            { "channel": 40, "busy_ms": 12, "agg_15m": { "active_ms": 900, "num_samples": 15 } }
        ]))
        .unwrap();
        let rows = survey_rows(&label(), Band::FiveG, &entries);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.channel, json!(40));
        assert_eq!(row.on_chan, json!("unknown"));
        assert_eq!(row.noise_floor, json!(-1));
        assert_eq!(row.agg_15m_active_ms, json!(900));
        assert_eq!(row.agg_15m_busy_ms, json!(-1));
    }

    #[test]
    fn neighbors_flatten_by_ssid() {
        let neighbors: IndexMap<String, Vec<Neighbor>> = serde_json::from_value(json!({
            "corp": [ { "bssid": "00:11:22:33:44:55", "in_network": true, "rssi": -60 },
                      { "channel": 11 } ],
            "guest": [ { "bssid": "00:11:22:33:44:66" } ]
        }))
        .unwrap();
        let rows = neighbor_rows(&label(), Band::TwoG, &neighbors);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].ssid, "corp");
        assert!(rows[0].in_network);
        assert_eq!(rows[1].bssid, "unknown");
        assert!(!rows[1].in_network);
        assert_eq!(rows[1].rssi, json!(-1));
        assert_eq!(rows[2].ssid, "guest");
    }
}
