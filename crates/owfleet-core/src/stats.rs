// ── Device stats collector ──
//
// Fetches each device's last state message with a fixed-backoff retry and
// keeps running payload-size and fetch-time diagnostics for the run.

use std::time::{Duration, Instant};

use owfleet_api::CloudClient;
use owfleet_api::models::DeviceStatistics;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::CoreError;
use crate::model::MacAddress;

/// One successful statistics fetch.
#[derive(Debug, Clone)]
pub struct StatsSample {
    pub mac: MacAddress,
    /// Size of the response body as received, compact JSON. The state-size
    /// thresholds are compared against this number, not a pretty-printed copy.
    pub bytes: usize,
    pub elapsed: Duration,
    pub stats: DeviceStatistics,
}

/// Load `mac`'s last state, retrying per `retry`.
///
/// Exhausting the attempts yields [`CoreError::StatsUnavailable`]; the caller
/// decides whether that ends the run.
pub async fn load_stats(
    client: &CloudClient,
    mac: &MacAddress,
    retry: RetryPolicy,
) -> Result<StatsSample, CoreError> {
    let attempts = retry.attempts.max(1);
    let started = Instant::now();

    for attempt in 1..=attempts {
        match client.device_statistics(mac.as_str()).await {
            Ok(payload) => {
                let elapsed = started.elapsed();
                debug!(
                    %mac,
                    bytes = payload.bytes,
                    took_ms = elapsed.as_millis(),
                    "stats loaded"
                );
                return Ok(StatsSample {
                    mac: mac.clone(),
                    bytes: payload.bytes,
                    elapsed,
                    stats: payload.stats,
                });
            }
            Err(e) => {
                warn!(%mac, attempt, attempts, error = %e, "stats fetch failed");
                if attempt < attempts {
                    tokio::time::sleep(retry.backoff).await;
                }
            }
        }
    }

    Err(CoreError::StatsUnavailable {
        mac: mac.to_string(),
        attempts,
    })
}

// ── Payload diagnostics ─────────────────────────────────────────────

/// A payload-size extreme and the device that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeMark {
    pub bytes: usize,
    pub mac: MacAddress,
}

/// Running min/max/average of statistics payload sizes and fetch times.
#[derive(Debug, Clone, Default)]
pub struct PayloadDiagnostics {
    pub count: u32,
    pub min: Option<SizeMark>,
    pub max: Option<SizeMark>,
    pub min_elapsed: Duration,
    pub max_elapsed: Duration,
    total_bytes: u64,
    total_elapsed: Duration,
}

impl PayloadDiagnostics {
    pub fn record(&mut self, sample: &StatsSample) {
        let bytes = sample.bytes;
        if self.min.as_ref().is_none_or(|m| bytes < m.bytes) {
            self.min = Some(SizeMark {
                bytes,
                mac: sample.mac.clone(),
            });
        }
        if self.max.as_ref().is_none_or(|m| bytes > m.bytes) {
            self.max = Some(SizeMark {
                bytes,
                mac: sample.mac.clone(),
            });
        }

        if self.count == 0 || sample.elapsed < self.min_elapsed {
            self.min_elapsed = sample.elapsed;
        }
        self.max_elapsed = self.max_elapsed.max(sample.elapsed);

        self.total_bytes = self
            .total_bytes
            .saturating_add(u64::try_from(bytes).unwrap_or(u64::MAX));
        self.total_elapsed += sample.elapsed;
        self.count += 1;
    }

    /// Mean payload size; 0 before the first sample.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn avg_bytes(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total_bytes as f64 / f64::from(self.count)
    }

    pub fn avg_elapsed(&self) -> Duration {
        self.total_elapsed
            .checked_div(self.count)
            .unwrap_or(Duration::ZERO)
    }
}
