// ── Client/RRM aggregator ──
//
// Wireless clients keyed by client MAC, each holding one record per AP that
// reported it. Association reports create connected records; RRM reports
// attach steering data, creating a bare record if the AP listed none.

use indexmap::IndexMap;
use owfleet_api::models::{Association, DeviceStatistics, RrmInfo};
use tracing::debug;

use crate::model::{
    AggregatedClient, ApClient, ApIdentity, ClientMetrics, ClientSighting, DeviceRef, MacAddress,
    RrmCapabilityFlags, RrmState, SteeringCounters,
};

#[derive(Debug, Default)]
struct ClientEntry {
    dups: u64,
    aps: IndexMap<MacAddress, ApClient>,
}

/// Every client seen during a run.
#[derive(Debug, Default)]
pub struct ClientTable {
    clients: IndexMap<MacAddress, ClientEntry>,
}

fn vlan_label(assoc: &Association, interface_vlan: Option<i64>) -> String {
    match (assoc.dynamic_vlan, interface_vlan) {
        (Some(v), _) => format!("D-{v}"),
        (None, Some(v)) => format!("S-{v}"),
        (None, None) => String::new(),
    }
}

fn mbps(rate: Option<&owfleet_api::models::Rate>) -> f64 {
    rate.and_then(|r| r.bitrate).map_or(0.0, |b| b / 1000.0)
}

impl ClientTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Clients currently associated to at least one AP.
    pub fn connected_count(&self) -> usize {
        self.clients
            .values()
            .filter(|c| c.aps.values().any(|a| a.metrics.connected))
            .count()
    }

    /// Record every association the AP reports.
    ///
    /// A client listed twice by the same AP bumps its duplicate counter; the
    /// more recent association (smaller `connected_time`) is kept.
    pub fn record_associations(
        &mut self,
        owner: &ApIdentity,
        device: DeviceRef,
        stats: &DeviceStatistics,
    ) {
        for iface in stats.interfaces.iter().flatten() {
            for ssid in iface.ssids.iter().flatten() {
                for assoc in ssid.associations.iter().flatten() {
                    let client = ApClient {
                        owner: owner.clone(),
                        metrics: ClientMetrics {
                            connected: true,
                            band: ssid.band.clone(),
                            ssid: ssid.ssid.clone(),
                            connected_time: assoc.connected,
                            rssi: assoc.rssi,
                            avg_ack_rssi: assoc.ack_signal_avg,
                            rx_rate: mbps(assoc.rx_rate.as_ref()),
                            tx_rate: mbps(assoc.tx_rate.as_ref()),
                            rx_packets: assoc.rx_packets,
                            rx_bytes: assoc.rx_bytes,
                            tx_packets: assoc.tx_packets,
                            tx_bytes: assoc.tx_bytes,
                            vlan_id: vlan_label(assoc, iface.vlan_id),
                            ..ClientMetrics::default()
                        },
                        device,
                    };
                    self.insert_association(MacAddress::new(&assoc.station), client);
                }
            }
        }
    }

    fn insert_association(&mut self, mac: MacAddress, client: ApClient) {
        let entry = self.clients.entry(mac).or_default();
        match entry.aps.get_mut(&client.owner.ap_mac) {
            Some(existing) => {
                entry.dups += 1;
                debug!(ap = %client.owner.ap_mac, "duplicate association");
                if client.metrics.connected_time <= existing.metrics.connected_time {
                    *existing = client;
                }
            }
            None => {
                entry.aps.insert(client.owner.ap_mac.clone(), client);
            }
        }
    }

    /// Attach the AP's RRM reports. Entries with no state are ignored.
    pub fn record_rrm(&mut self, owner: &ApIdentity, device: DeviceRef, rrm: &[RrmInfo]) {
        for info in rrm {
            let Some(state) = info.state else {
                continue;
            };
            let entry = self.clients.entry(MacAddress::new(&info.mac)).or_default();
            let client = entry
                .aps
                .entry(owner.ap_mac.clone())
                .or_insert_with(|| ApClient {
                    owner: owner.clone(),
                    metrics: ClientMetrics::default(),
                    device,
                });

            let m = &mut client.metrics;
            m.rrm_state = RrmState::label(state);
            m.rrm_bands = info.supported_bands.clone();
            m.rrm_active = info.active;
            m.rrm_pps = info.pps_rx.clone();
            m.steering = SteeringCounters::from(&info.stats);
            m.capabilities = RrmCapabilityFlags::new(info.wnm, &info.rrm);
        }
    }

    /// One row per (client, AP), in first-seen order.
    pub fn sightings(&self) -> Vec<ClientSighting> {
        self.clients
            .iter()
            .flat_map(|(mac, entry)| {
                entry.aps.values().map(move |client| ClientSighting {
                    mac: mac.clone(),
                    client: client.clone(),
                })
            })
            .collect()
    }

    /// Collapse each client to its primary AP record.
    ///
    /// The primary is the connected record with the smallest
    /// `connected_time`, or the first record when none is connected. The
    /// other records' steering counters are summed into it.
    pub fn aggregate(&self) -> Vec<AggregatedClient> {
        self.clients
            .iter()
            .filter_map(|(mac, entry)| {
                let mut primary: Option<(usize, &ApClient)> = None;
                for (idx, client) in entry.aps.values().enumerate() {
                    if !client.metrics.connected {
                        continue;
                    }
                    if primary
                        .is_none_or(|(_, p)| client.metrics.connected_time < p.metrics.connected_time)
                    {
                        primary = Some((idx, client));
                    }
                }
                let (primary_idx, primary) =
                    primary.or_else(|| entry.aps.first().map(|(_, c)| (0, c)))?;

                let mut metrics = primary.metrics.clone();
                for (idx, other) in entry.aps.values().enumerate() {
                    if idx != primary_idx {
                        metrics.steering += &other.metrics.steering;
                    }
                }

                Some(AggregatedClient {
                    mac: mac.clone(),
                    org: primary.owner.org.clone(),
                    venue: primary.owner.venue.clone(),
                    ap_cnt: entry.aps.len(),
                    dups: entry.dups,
                    metrics,
                })
            })
            .collect()
    }
}
