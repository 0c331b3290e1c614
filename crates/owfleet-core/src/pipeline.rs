// ── Collection run ──
//
// One pass over a deployment: load provisioning data and the device list,
// fetch each connected device's last state, and fold it into the run's
// tables. All accumulation lives in `RunContext`, owned by the run.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use owfleet_api::models::{ConnectionStatistics, RawDevice};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::anomaly::{BrokenLan, HighMemory, RemoteLogging, StaleDevice, StateSizeOutlier, Warnings};
use crate::cache::DataCache;
use crate::clients::ClientTable;
use crate::config::{CollectOptions, DeploymentConfig, StatsFailurePolicy};
use crate::error::CoreError;
use crate::fetch;
use crate::model::{
    AggregatedClient, ClientSighting, DeviceRef, MacAddress, NeighborRecord, NormalizedDevice,
    SurveyRecord,
};
use crate::normalize::{self, Identity};
use crate::provisioning::{DeviceInfo, ProvData};
use crate::report::{ReportWriter, Table};
use crate::session::Session;
use crate::stats::{self, PayloadDiagnostics, SizeMark, StatsSample};

// ── Run context ─────────────────────────────────────────────────────

/// Accumulators for one run.
#[derive(Debug, Default)]
pub struct RunContext {
    pub devices: Vec<NormalizedDevice>,
    pub survey: Vec<SurveyRecord>,
    pub neighbors: Vec<NeighborRecord>,
    pub clients: ClientTable,
    pub warnings: Warnings,
    pub payload: PayloadDiagnostics,
    /// Devices in the listing, connected or not.
    pub total: usize,
    /// Devices that made it into the device table.
    pub processed: usize,
    /// Devices dropped because their statistics could not be loaded.
    pub skipped: Vec<MacAddress>,
    seen: HashSet<MacAddress>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `mac` already has a row this run.
    pub fn contains(&self, mac: &MacAddress) -> bool {
        self.seen.contains(mac)
    }

    /// Fold one device's last state into the run's tables.
    ///
    /// `now` is the run's reference time in Unix seconds.
    pub fn process_device(
        &mut self,
        raw: &RawDevice,
        identity: &Identity,
        sample: &StatsSample,
        now: i64,
        options: &CollectOptions,
    ) {
        let thresholds = &options.thresholds;
        self.payload.record(sample);
        self.warnings
            .check_state_size(&identity.mac, sample.bytes, thresholds);

        let config = raw.configuration();
        if let Some(config) = &config {
            self.warnings.check_configuration(&identity.mac, config);
        }

        let stats = &sample.stats;
        let dev = normalize::normalize_device(
            raw,
            identity,
            config.as_ref(),
            stats,
            now,
            &options.firmware_marker,
        );
        self.warnings.check_device(&dev, thresholds);

        let device = DeviceRef(self.devices.len());
        let owner = dev.ap_identity();
        let label = dev.label();

        self.clients.record_associations(&owner, device, stats);
        for radio in &stats.radios {
            let Some(band) = normalize::radio_band(radio) else {
                continue;
            };
            self.survey
                .extend(normalize::survey_rows(&label, band, &radio.survey));
            self.neighbors
                .extend(normalize::neighbor_rows(&label, band, &radio.neighbors));
        }
        self.clients.record_rrm(&owner, device, &stats.rrm_info);

        self.seen.insert(dev.mac.clone());
        self.devices.push(dev);
        self.processed += 1;
    }
}

// ── Summary ─────────────────────────────────────────────────────────

/// A finding paired with the flagged device's place in the hierarchy.
#[derive(Debug, Clone, Serialize)]
pub struct Flagged<T> {
    #[serde(flatten)]
    pub finding: T,
    pub device: DeviceInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayloadSummary {
    pub samples: u32,
    pub min: Option<Flagged<SizeMark>>,
    pub max: Option<Flagged<SizeMark>>,
    pub avg_bytes: f64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub avg_ms: u64,
}

/// End-of-run report: counts, payload diagnostics and every warning.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub deployment: String,
    pub connection: Option<ConnectionStatistics>,
    pub total_devices: usize,
    pub processed: usize,
    pub skipped: Vec<DeviceInfo>,
    pub total_clients: usize,
    pub connected_clients: usize,
    pub payload: PayloadSummary,
    pub stale: Vec<Flagged<StaleDevice>>,
    pub high_memory: Vec<Flagged<HighMemory>>,
    pub state_size: Vec<Flagged<StateSizeOutlier>>,
    pub broken_lan: Vec<Flagged<BrokenLan>>,
    pub remote_logging: Vec<Flagged<RemoteLogging>>,
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn flag<T: Clone>(
    prov: &ProvData,
    findings: &[T],
    mac: impl Fn(&T) -> &MacAddress,
) -> Vec<Flagged<T>> {
    findings
        .iter()
        .map(|f| Flagged {
            device: prov.device_info_or_unknown(mac(f)),
            finding: f.clone(),
        })
        .collect()
}

impl RunSummary {
    fn build(
        deployment: &str,
        connection: Option<ConnectionStatistics>,
        ctx: &RunContext,
        prov: &ProvData,
    ) -> Self {
        let w = &ctx.warnings;
        let p = &ctx.payload;
        let mark = |m: &Option<SizeMark>| {
            m.as_ref().map(|m| Flagged {
                device: prov.device_info_or_unknown(&m.mac),
                finding: m.clone(),
            })
        };

        Self {
            deployment: deployment.to_owned(),
            connection,
            total_devices: ctx.total,
            processed: ctx.processed,
            skipped: ctx
                .skipped
                .iter()
                .map(|mac| prov.device_info_or_unknown(mac))
                .collect(),
            total_clients: ctx.clients.len(),
            connected_clients: ctx.clients.connected_count(),
            payload: PayloadSummary {
                samples: p.count,
                min: mark(&p.min),
                max: mark(&p.max),
                avg_bytes: p.avg_bytes(),
                min_ms: millis(p.min_elapsed),
                max_ms: millis(p.max_elapsed),
                avg_ms: millis(p.avg_elapsed()),
            },
            stale: flag(prov, &w.stale, |f| &f.mac),
            high_memory: flag(prov, &w.high_memory, |f| &f.mac),
            state_size: flag(prov, &w.state_size, |f| &f.mac),
            broken_lan: flag(prov, &w.broken_lan, |f| &f.mac),
            remote_logging: flag(prov, &w.remote_logging, |f| &f.mac),
        }
    }
}

// ── Run ─────────────────────────────────────────────────────────────

/// Everything a run produced.
#[derive(Debug)]
pub struct RunOutput {
    /// Local time the run's tables are stamped with.
    pub started: DateTime<Local>,
    pub devices: Vec<NormalizedDevice>,
    pub survey: Vec<SurveyRecord>,
    pub neighbors: Vec<NeighborRecord>,
    pub sightings: Vec<ClientSighting>,
    pub clients: Vec<AggregatedClient>,
    pub summary: RunSummary,
}

impl RunOutput {
    /// Write the five tables; returns every file written.
    pub fn write_reports(&self, writer: &ReportWriter) -> Result<Vec<PathBuf>, CoreError> {
        let mut paths = writer.write(Table::OnlineDevices, &self.devices)?;
        paths.extend(writer.write(Table::SurveyData, &self.survey)?);
        paths.extend(writer.write(Table::NeighborsData, &self.neighbors)?);
        paths.extend(writer.write(Table::ClientsByAp, &self.sightings)?);
        paths.extend(writer.write(Table::Clients, &self.clients)?);
        Ok(paths)
    }
}

/// Run a full collection against an authenticated session.
///
/// Fails on authentication errors, on a void device or provisioning
/// listing, and (under
/// [`StatsFailurePolicy::Abort`]) on the first device whose statistics
/// cannot be loaded.
pub async fn collect(
    session: &Session,
    config: &DeploymentConfig,
    options: &CollectOptions,
) -> Result<RunOutput, CoreError> {
    let client = session.client();
    let cache = DataCache::new(&config.cache_dir, &config.name, config.cache_ttl);

    let prov = ProvData::load(client, &cache, options.use_cache, config.fetch).await?;
    let started = Local::now();
    let now = started.timestamp();

    let devices = fetch::load_devices(client, &cache, options.use_cache, config.fetch).await?;
    let connection = match client.connection_stats().await {
        Ok(stats) => Some(stats),
        Err(e) if e.is_auth_expired() => return Err(e.into()),
        Err(e) => {
            warn!(error = %e, "connection statistics unavailable");
            None
        }
    };
    info!(
        total = devices.len(),
        connected = connection.as_ref().map(|c| c.connected_devices),
        org = options.org.as_deref(),
        venue = options.venue.as_deref(),
        "processing online devices"
    );

    let mut ctx = RunContext::new();
    for raw in &devices {
        ctx.total += 1;
        if !raw.connected {
            continue;
        }
        let identity = Identity::resolve(raw, &prov);
        if !identity.matches(options.org.as_deref(), options.venue.as_deref()) {
            continue;
        }
        if ctx.contains(&identity.mac) {
            warn!(mac = %identity.mac, "device listed twice; keeping the first");
            continue;
        }

        let sample = match stats::load_stats(client, &identity.mac, options.stats_retry).await {
            Ok(sample) => sample,
            Err(e @ CoreError::StatsUnavailable { .. }) => match options.stats_policy {
                StatsFailurePolicy::Abort => return Err(e),
                StatsFailurePolicy::SkipDevice => {
                    warn!(mac = %identity.mac, "skipping device without statistics");
                    ctx.skipped.push(identity.mac.clone());
                    tokio::time::sleep(config.fetch.request_delay).await;
                    continue;
                }
            },
            Err(e) => return Err(e),
        };
        tokio::time::sleep(config.fetch.request_delay).await;

        debug!(mac = %identity.mac, name = %identity.name, "processing device");
        ctx.process_device(raw, &identity, &sample, now, options);
    }

    let sightings = ctx.clients.sightings();
    let clients = ctx.clients.aggregate();
    info!(
        processed = ctx.processed,
        total = ctx.total,
        clients = clients.len(),
        "run complete"
    );

    let summary = RunSummary::build(&config.name, connection, &ctx, &prov);
    Ok(RunOutput {
        started,
        devices: ctx.devices,
        survey: ctx.survey,
        neighbors: ctx.neighbors,
        sightings,
        clients,
        summary,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use owfleet_api::models::DeviceStatistics;
    use serde_json::json;

    use super::*;
    use crate::provisioning::ProvCollections;

    fn sample(mac: &str, bytes: usize, stats: serde_json::Value) -> StatsSample {
        StatsSample {
            mac: mac.into(),
            bytes,
            elapsed: Duration::from_millis(5),
            stats: serde_json::from_value::<DeviceStatistics>(stats).unwrap(),
        }
    }

    #[test]
    fn process_device_fills_every_table() {
        let prov = ProvData::new(ProvCollections::default());
        let raw: RawDevice = serde_json::from_value(json!({
            "serialNumber": "aa0000000001",
            "connected": true,
            "configuration": {
                "interfaces": [
                    { "ethernet": [ { "select-ports": ["LAN1"] } ] },
                    { "ethernet": [ { "select-ports": ["LAN1"] } ] }
                ]
            }
        }))
        .unwrap();
        let identity = Identity::resolve(&raw, &prov);
        let s = sample(
            "aa0000000001",
            1200,
            json!({
                "unit": { "localtime": 1000, "memory": { "free": 100, "total": 1000 } },
                "interfaces": [ { "ssids": [ { "band": "5G", "ssid": "corp", "associations": [
                    { "station": "c1", "connected": 12 }
                ] } ] } ],
                "radios": [ {
                    "band": ["5G"],
                    "survey": [ { "channel": 36, "agg_15m": { "num_samples": 3 } } ],
                    "neighbors": { "corp": [ { "bssid": "x" } ] }
                }, { "band": ["60G"], "survey": [ { "agg_15m": {} } ] } ]
            }),
        );

        let mut ctx = RunContext::new();
        ctx.process_device(&raw, &identity, &s, 1500, &CollectOptions::default());

        assert_eq!(ctx.processed, 1);
        assert!(ctx.contains(&"AA0000000001".into()));
        assert_eq!(ctx.devices[0].last_state, 500);
        assert_eq!(ctx.survey.len(), 1);
        assert_eq!(ctx.neighbors.len(), 1);
        assert_eq!(ctx.clients.len(), 1);
        assert_eq!(ctx.warnings.stale.len(), 1);
        assert_eq!(ctx.warnings.high_memory.len(), 1);
        assert_eq!(ctx.warnings.state_size.len(), 1);
        assert_eq!(ctx.warnings.broken_lan[0].dup_cnt, 1);
        assert_eq!(ctx.payload.count, 1);

        let summary = RunSummary::build("LAB", None, &ctx, &prov);
        assert_eq!(summary.stale[0].device.name, "unknown");
        assert_eq!(summary.payload.min.unwrap().finding.bytes, 1200);
        assert_eq!(summary.connected_clients, 1);
    }
}
