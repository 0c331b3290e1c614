// ── Collection fetchers ──
//
// Count-then-page loading of the four bulk collections. A collection is
// either complete or void: any failure after the count yields
// `CoreError::CollectionUnavailable`, never a partial list.

use std::future::Future;
use std::time::Instant;

use owfleet_api::models::{Entity, InventoryRecord, RawDevice, Venue};
use owfleet_api::{CloudClient, paginate_all};
use tracing::{info, warn};

use crate::cache::DataCache;
use crate::config::FetchSettings;
use crate::error::CoreError;

/// Cache entry name of the full device listing.
pub const DEVICES_CACHE: &str = "Devices";

async fn fetch_collection<T, C, P, PFut>(
    resource: &'static str,
    count: C,
    settings: FetchSettings,
    page: P,
) -> Result<Vec<T>, CoreError>
where
    C: Future<Output = Result<Option<u64>, owfleet_api::Error>>,
    P: Fn(u64, u32) -> PFut,
    PFut: Future<Output = Result<Vec<T>, owfleet_api::Error>>,
{
    let total = match count.await {
        Ok(Some(total)) => total,
        Ok(None) => {
            warn!(resource, "count query returned no count");
            return Err(CoreError::CollectionUnavailable {
                resource,
                reason: "count not reported".into(),
            });
        }
        Err(e) => return Err(void(resource, e)),
    };

    info!(
        resource,
        total,
        page_size = settings.page_size,
        "loading collection"
    );
    let started = Instant::now();
    let items = paginate_all(total, settings.page_size, settings.request_delay, page)
        .await
        .map_err(|e| void(resource, e))?;
    info!(
        resource,
        items = items.len(),
        took_ms = started.elapsed().as_millis(),
        "collection loaded"
    );
    Ok(items)
}

/// Auth failures stay auth failures; anything else voids the collection.
fn void(resource: &'static str, err: owfleet_api::Error) -> CoreError {
    if err.is_auth_expired() {
        return CoreError::from(err);
    }
    warn!(resource, error = %err, "collection fetch failed");
    CoreError::CollectionUnavailable {
        resource,
        reason: err.to_string(),
    }
}

/// Every device known to the gateway.
pub async fn fetch_devices(
    client: &CloudClient,
    settings: FetchSettings,
) -> Result<Vec<RawDevice>, CoreError> {
    fetch_collection("devices", client.device_count(), settings, |offset, limit| {
        client.list_devices(limit, offset)
    })
    .await
}

pub async fn fetch_inventory(
    client: &CloudClient,
    settings: FetchSettings,
) -> Result<Vec<InventoryRecord>, CoreError> {
    fetch_collection(
        "inventory",
        client.inventory_count(),
        settings,
        |offset, limit| client.list_inventory(limit, offset),
    )
    .await
}

pub async fn fetch_venues(
    client: &CloudClient,
    settings: FetchSettings,
) -> Result<Vec<Venue>, CoreError> {
    fetch_collection("venues", client.venue_count(), settings, |offset, limit| {
        client.list_venues(limit, offset)
    })
    .await
}

pub async fn fetch_entities(
    client: &CloudClient,
    settings: FetchSettings,
) -> Result<Vec<Entity>, CoreError> {
    fetch_collection("entities", client.entity_count(), settings, |offset, limit| {
        client.list_entities(limit, offset)
    })
    .await
}

/// The device listing. Served from `cache` when `use_cached` is set and
/// the entry is fresh; a fresh fetch always refreshes the entry.
pub async fn load_devices(
    client: &CloudClient,
    cache: &DataCache,
    use_cached: bool,
    settings: FetchSettings,
) -> Result<Vec<RawDevice>, CoreError> {
    let fetch = || fetch_devices(client, settings);
    if use_cached {
        cache.load_or_fetch(DEVICES_CACHE, fetch).await
    } else {
        cache.refresh(DEVICES_CACHE, fetch).await
    }
}
