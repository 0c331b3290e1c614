// Gateway device endpoints
//
// Fleet-wide counts and listings plus the per-device last-state fetch.

use tracing::debug;

use crate::client::{CloudClient, Service};
use crate::error::Error;
use crate::models::{
    ConnectionStatistics, CountResponse, DeviceListEnvelope, DeviceStatistics, RawDevice,
    StatisticsPayload,
};

impl CloudClient {
    /// Fleet connection summary.
    ///
    /// `GET /api/v1/devices?connectionStatistics=true`
    pub async fn connection_stats(&self) -> Result<ConnectionStatistics, Error> {
        self.get(
            Service::Gateway,
            "/api/v1/devices",
            &[("connectionStatistics", "true".into())],
        )
        .await
    }

    /// Total number of devices known to the gateway. `None` when the
    /// response carries no `count`.
    ///
    /// `GET /api/v1/devices?countOnly=true`
    pub async fn device_count(&self) -> Result<Option<u64>, Error> {
        let resp: CountResponse = self
            .get(
                Service::Gateway,
                "/api/v1/devices",
                &[("countOnly", "true".into())],
            )
            .await?;
        Ok(resp.count)
    }

    /// One page of devices with their connection status.
    ///
    /// `GET /api/v1/devices?deviceWithStatus=true&limit={limit}&offset={offset}`
    pub async fn list_devices(&self, limit: u32, offset: u64) -> Result<Vec<RawDevice>, Error> {
        let resp: DeviceListEnvelope = self
            .get(
                Service::Gateway,
                "/api/v1/devices",
                &[
                    ("deviceWithStatus", "true".into()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;
        resp.devices.ok_or(Error::MissingField {
            field: "devicesWithStatus",
        })
    }

    /// Latest state message of one device, with its size on the wire.
    ///
    /// `GET /api/v1/device/{mac}/statistics?lastOnly=true`
    pub async fn device_statistics(&self, mac: &str) -> Result<StatisticsPayload, Error> {
        let path = format!("/api/v1/device/{mac}/statistics");
        let body = self
            .get_text(Service::Gateway, &path, &[("lastOnly", "true".into())])
            .await?;
        let bytes = body.len();
        debug!(mac, bytes, "device statistics received");

        let stats: DeviceStatistics = serde_json::from_str(&body).map_err(|e| {
            Error::Deserialization {
                message: format!("statistics for {mac}: {e}"),
                body,
            }
        })?;
        Ok(StatisticsPayload { bytes, stats })
    }
}
