// ── Provisioning resolver ──
//
// Inventory → venue → entity joins. Each collection is indexed once at load
// time; the first record carrying a given key wins, so lookups agree with a
// front-to-back scan of the listing.

use std::collections::HashMap;
use std::fmt;

use owfleet_api::CloudClient;
use owfleet_api::models::{Entity, InventoryRecord, RawDevice, Venue};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::DataCache;
use crate::config::FetchSettings;
use crate::error::CoreError;
use crate::fetch;
use crate::model::MacAddress;

/// Cache entry name of the combined provisioning listings.
pub const PROV_CACHE: &str = "ProvData";

/// Placeholder for any name a lookup could not resolve.
pub const UNKNOWN: &str = "unknown";

/// The three provisioning listings as fetched (and cached).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvCollections {
    pub inventory: Vec<InventoryRecord>,
    pub venues: Vec<Venue>,
    pub entities: Vec<Entity>,
}

/// Name, venue and owning organization of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub mac: MacAddress,
    pub name: String,
    pub entity: String,
    pub venue: String,
}

impl DeviceInfo {
    pub fn unknown(mac: &MacAddress) -> Self {
        Self {
            mac: mac.clone(),
            name: UNKNOWN.into(),
            entity: UNKNOWN.into(),
            venue: UNKNOWN.into(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {} => {}", self.entity, self.venue, self.name)
    }
}

/// A device eligible for a control operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub mac: MacAddress,
    pub name: String,
    pub model: String,
    pub org: String,
    pub venue: String,
}

/// Indexed provisioning data for one deployment.
#[derive(Debug, Default)]
pub struct ProvData {
    data: ProvCollections,
    inventory_by_mac: HashMap<MacAddress, usize>,
    inventory_by_id: HashMap<String, usize>,
    venue_by_id: HashMap<String, usize>,
    venues_by_name: HashMap<String, Vec<usize>>,
    entity_by_id: HashMap<String, usize>,
    entity_by_name: HashMap<String, usize>,
}

fn first_wins<K: std::hash::Hash + Eq>(map: &mut HashMap<K, usize>, key: K, idx: usize) {
    map.entry(key).or_insert(idx);
}

impl ProvData {
    pub fn new(data: ProvCollections) -> Self {
        let mut out = Self::default();

        for (idx, inv) in data.inventory.iter().enumerate() {
            if let Some(serial) = &inv.serial_number {
                first_wins(&mut out.inventory_by_mac, MacAddress::new(serial), idx);
            }
            first_wins(&mut out.inventory_by_id, inv.id.clone(), idx);
        }
        for (idx, venue) in data.venues.iter().enumerate() {
            first_wins(&mut out.venue_by_id, venue.id.clone(), idx);
            out.venues_by_name
                .entry(venue.name.clone())
                .or_default()
                .push(idx);
        }
        for (idx, entity) in data.entities.iter().enumerate() {
            first_wins(&mut out.entity_by_id, entity.id.clone(), idx);
            first_wins(&mut out.entity_by_name, entity.name.clone(), idx);
        }

        out.data = data;
        out
    }

    /// Load the listings, from the `ProvData` cache entry when allowed.
    ///
    /// All three listings must load: a void inventory, venue or entity
    /// collection fails with [`CoreError::CollectionUnavailable`], and the
    /// cache entry is left untouched.
    pub async fn load(
        client: &CloudClient,
        cache: &DataCache,
        use_cached: bool,
        settings: FetchSettings,
    ) -> Result<Self, CoreError> {
        if use_cached {
            if let Some(data) = cache.load::<ProvCollections>(PROV_CACHE) {
                info!(
                    inventory = data.inventory.len(),
                    venues = data.venues.len(),
                    entities = data.entities.len(),
                    "provisioning data loaded from cache"
                );
                return Ok(Self::new(data));
            }
        }

        let data = ProvCollections {
            inventory: fetch::fetch_inventory(client, settings).await?,
            venues: fetch::fetch_venues(client, settings).await?,
            entities: fetch::fetch_entities(client, settings).await?,
        };

        if let Err(e) = cache.store(PROV_CACHE, &data) {
            warn!(error = %e, "failed to write provisioning cache");
        }
        Ok(Self::new(data))
    }

    pub fn collections(&self) -> &ProvCollections {
        &self.data
    }

    // ── Lookups ─────────────────────────────────────────────────────

    pub fn inventory_by_mac(&self, mac: &MacAddress) -> Option<&InventoryRecord> {
        self.inventory_by_mac
            .get(mac)
            .and_then(|i| self.data.inventory.get(*i))
    }

    pub fn inventory_by_uuid(&self, id: &str) -> Option<&InventoryRecord> {
        self.inventory_by_id
            .get(id)
            .and_then(|i| self.data.inventory.get(*i))
    }

    pub fn venue_by_uuid(&self, id: &str) -> Option<&Venue> {
        self.venue_by_id.get(id).and_then(|i| self.data.venues.get(*i))
    }

    /// First venue named `name`. With `entity_id`, venues that name a
    /// different owning entity are passed over.
    pub fn venue_by_name(&self, name: &str, entity_id: Option<&str>) -> Option<&Venue> {
        self.venues_by_name
            .get(name)?
            .iter()
            .filter_map(|i| self.data.venues.get(*i))
            .find(|v| match (entity_id, v.entity.as_deref()) {
                (Some(want), Some(have)) => want == have,
                _ => true,
            })
    }

    pub fn entity_by_uuid(&self, id: &str) -> Option<&Entity> {
        self.entity_by_id
            .get(id)
            .and_then(|i| self.data.entities.get(*i))
    }

    pub fn entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.entity_by_name
            .get(name)
            .and_then(|i| self.data.entities.get(*i))
    }

    /// Walk inventory → venue → entity for `mac`. `None` if any hop is missing.
    pub fn device_info(&self, mac: &MacAddress) -> Option<DeviceInfo> {
        let inv = self.inventory_by_mac(mac)?;
        let venue = self.venue_by_uuid(inv.venue.as_deref()?)?;
        let entity = self.entity_by_uuid(venue.entity.as_deref()?)?;
        Some(DeviceInfo {
            mac: mac.clone(),
            name: inv.name.clone(),
            entity: entity.name.clone(),
            venue: venue.name.clone(),
        })
    }

    /// Like [`device_info`](Self::device_info), filled with "unknown" on a miss.
    pub fn device_info_or_unknown(&self, mac: &MacAddress) -> DeviceInfo {
        self.device_info(mac)
            .unwrap_or_else(|| DeviceInfo::unknown(mac))
    }

    /// Devices that can be addressed by name: present in inventory with a
    /// resolvable venue, and matching the exact `org`/`venue` names if given.
    pub fn matching_targets(
        &self,
        devices: &[RawDevice],
        org: Option<&str>,
        venue: Option<&str>,
        connected_only: bool,
    ) -> Vec<Target> {
        devices
            .iter()
            .filter(|d| d.connected || !connected_only)
            .filter_map(|d| {
                let mac = MacAddress::new(&d.serial_number);
                let inv = self.inventory_by_mac(&mac)?;
                let venue_id = inv.venue.as_deref().unwrap_or(&d.venue);
                let v = self.venue_by_uuid(venue_id)?;
                if venue.is_some_and(|want| want != v.name) {
                    return None;
                }
                let entity = v.entity.as_deref().and_then(|id| self.entity_by_uuid(id));
                let org_name = match (entity, org) {
                    (None, Some(_)) => return None,
                    (Some(e), Some(want)) if e.name != want => return None,
                    (Some(e), _) => e.name.clone(),
                    (None, None) => UNKNOWN.into(),
                };
                Some(Target {
                    mac,
                    name: inv.name.clone(),
                    model: inv.device_type.clone(),
                    org: org_name,
                    venue: v.name.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn sample() -> ProvData {
        let data: ProvCollections = serde_json::from_value(json!({
            "inventory": [
                { "id": "i1", "serialNumber": "aa0000000001", "name": "lobby", "deviceType": "eap101", "venue": "v1" },
                { "id": "i2", "serialNumber": "aa0000000002", "name": "roof", "deviceType": "eap102", "venue": "v-missing" },
                { "id": "i3", "serialNumber": "aa0000000001", "name": "shadow", "deviceType": "eap101", "venue": "v1" },
                { "id": "i4", "serialNumber": "aa0000000004", "name": "annex", "deviceType": "eap104" }
            ],
            "venues": [
                { "id": "v1", "name": "HQ", "entity": "e1" },
                { "id": "v2", "name": "HQ", "entity": "e2" },
                { "id": "v3", "name": "Depot", "entity": "e2" }
            ],
            "entities": [
                { "id": "e1", "name": "Acme" },
                { "id": "e2", "name": "Globex" }
            ]
        }))
        .unwrap();
        ProvData::new(data)
    }

    fn device(serial: &str, connected: bool, venue: &str) -> RawDevice {
        serde_json::from_value(json!({
            "serialNumber": serial,
            "connected": connected,
            "venue": venue,
        }))
        .unwrap()
    }

    #[test]
    fn first_record_wins() {
        let prov = sample();
        let inv = prov.inventory_by_mac(&"aa0000000001".into()).unwrap();
        assert_eq!(inv.name, "lobby");
        assert_eq!(prov.inventory_by_uuid("i3").unwrap().name, "shadow");
    }

    #[test]
    fn venue_by_name_scoped_to_entity() {
        let prov = sample();
        assert_eq!(prov.venue_by_name("HQ", None).unwrap().id, "v1");
        assert_eq!(prov.venue_by_name("HQ", Some("e2")).unwrap().id, "v2");
        assert!(prov.venue_by_name("HQ", Some("e9")).is_none());
        assert_eq!(prov.entity_by_name("Globex").unwrap().id, "e2");
    }

    #[test]
    fn device_info_walks_hierarchy() {
        let prov = sample();
        let info = prov.device_info(&"aa0000000001".into()).unwrap();
        assert_eq!(info.to_string(), "Acme => HQ => lobby");

        assert!(prov.device_info(&"aa0000000002".into()).is_none());
        let unknown = prov.device_info_or_unknown(&"aa0000000002".into());
        assert_eq!(unknown, DeviceInfo::unknown(&"aa0000000002".into()));
    }

    #[test]
    fn matching_targets_filters() {
        let prov = sample();
        let devices = vec![
            device("aa0000000001", true, ""),
            device("aa0000000002", true, ""),
            device("aa0000000004", false, "v3"),
            device("ff0000000009", true, "v1"),
        ];

        let connected = prov.matching_targets(&devices, None, None, true);
        assert_eq!(connected.len(), 1);
        assert_eq!(connected[0].name, "lobby");
        assert_eq!(connected[0].org, "Acme");

        // Inventory without a venue falls back to the device's own venue.
        let all = prov.matching_targets(&devices, Some("Globex"), None, false);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].venue, "Depot");

        assert!(
            prov.matching_targets(&devices, None, Some("hq"), true)
                .is_empty()
        );
    }
}
