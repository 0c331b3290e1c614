// Provisioning service endpoints
//
// Inventory, venues and entities. Each collection has a `countOnly=true`
// form and a paged form keyed by its own list field.

use crate::client::{CloudClient, Service};
use crate::error::Error;
use crate::models::{
    CountResponse, Entity, EntityEnvelope, InventoryEnvelope, InventoryRecord, Venue,
    VenueEnvelope,
};

fn page_params(limit: u32, offset: u64) -> [(&'static str, String); 2] {
    [("limit", limit.to_string()), ("offset", offset.to_string())]
}

impl CloudClient {
    async fn provisioning_count(&self, path: &str) -> Result<Option<u64>, Error> {
        let resp: CountResponse = self
            .get(Service::Provisioning, path, &[("countOnly", "true".into())])
            .await?;
        Ok(resp.count)
    }

    /// `GET /api/v1/inventory?countOnly=true`
    pub async fn inventory_count(&self) -> Result<Option<u64>, Error> {
        self.provisioning_count("/api/v1/inventory").await
    }

    /// `GET /api/v1/inventory?withExtendedInfo=true&limit&offset`
    pub async fn list_inventory(
        &self,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<InventoryRecord>, Error> {
        let [limit, offset] = page_params(limit, offset);
        let resp: InventoryEnvelope = self
            .get(
                Service::Provisioning,
                "/api/v1/inventory",
                &[("withExtendedInfo", "true".into()), limit, offset],
            )
            .await?;
        resp.taglist.ok_or(Error::MissingField { field: "taglist" })
    }

    /// `GET /api/v1/venue?countOnly=true`
    pub async fn venue_count(&self) -> Result<Option<u64>, Error> {
        self.provisioning_count("/api/v1/venue").await
    }

    /// `GET /api/v1/venue?limit&offset`
    pub async fn list_venues(&self, limit: u32, offset: u64) -> Result<Vec<Venue>, Error> {
        let resp: VenueEnvelope = self
            .get(
                Service::Provisioning,
                "/api/v1/venue",
                &page_params(limit, offset),
            )
            .await?;
        resp.venues.ok_or(Error::MissingField { field: "venues" })
    }

    /// `GET /api/v1/entity?countOnly=true`
    pub async fn entity_count(&self) -> Result<Option<u64>, Error> {
        self.provisioning_count("/api/v1/entity").await
    }

    /// `GET /api/v1/entity?limit&offset`
    pub async fn list_entities(&self, limit: u32, offset: u64) -> Result<Vec<Entity>, Error> {
        let resp: EntityEnvelope = self
            .get(
                Service::Provisioning,
                "/api/v1/entity",
                &page_params(limit, offset),
            )
            .await?;
        resp.entities.ok_or(Error::MissingField { field: "entities" })
    }
}
