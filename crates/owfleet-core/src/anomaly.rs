// ── Anomaly detector ──
//
// Stateless health checks run during the device loop. Each check appends to
// its own list and none of them fails the run.

use owfleet_api::models::DeviceConfiguration;
use serde::Serialize;
use tracing::debug;

use crate::config::Thresholds;
use crate::model::{MacAddress, NormalizedDevice};

const LAN_PREFIX: &str = "LAN";
const LAN_WILDCARD: &str = "LAN*";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaleDevice {
    pub mac: MacAddress,
    pub last_state: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighMemory {
    pub mac: MacAddress,
    pub mem_used_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSizeOutlier {
    pub mac: MacAddress,
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenLan {
    pub mac: MacAddress,
    pub dup_cnt: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteLogging {
    pub mac: MacAddress,
    pub host: String,
    pub port: Option<u16>,
}

/// Everything flagged during one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Warnings {
    pub stale: Vec<StaleDevice>,
    pub high_memory: Vec<HighMemory>,
    pub state_size: Vec<StateSizeOutlier>,
    pub broken_lan: Vec<BrokenLan>,
    pub remote_logging: Vec<RemoteLogging>,
}

impl Warnings {
    /// Stale-state and memory checks against a normalized row.
    pub fn check_device(&mut self, dev: &NormalizedDevice, thresholds: &Thresholds) {
        if dev.last_state > thresholds.stale_secs {
            debug!(mac = %dev.mac, last_state = dev.last_state, "stale state");
            self.stale.push(StaleDevice {
                mac: dev.mac.clone(),
                last_state: dev.last_state,
            });
        }
        if dev.mem_used_pct > thresholds.memory_pct {
            debug!(mac = %dev.mac, mem_used_pct = dev.mem_used_pct, "high memory use");
            self.high_memory.push(HighMemory {
                mac: dev.mac.clone(),
                mem_used_pct: dev.mem_used_pct,
            });
        }
    }

    /// Flag a statistics payload outside the accepted size range.
    pub fn check_state_size(&mut self, mac: &MacAddress, bytes: usize, thresholds: &Thresholds) {
        if bytes < thresholds.state_size_min || bytes > thresholds.state_size_max {
            debug!(%mac, bytes, "state size outlier");
            self.state_size.push(StateSizeOutlier {
                mac: mac.clone(),
                bytes,
            });
        }
    }

    /// LAN port conflicts and remote logging in the pushed configuration.
    pub fn check_configuration(&mut self, mac: &MacAddress, config: &DeviceConfiguration) {
        let dup_cnt = lan_conflicts(config);
        if dup_cnt > 0 {
            debug!(%mac, dup_cnt, "LAN port selected by several interfaces");
            self.broken_lan.push(BrokenLan {
                mac: mac.clone(),
                dup_cnt,
            });
        }

        let log = config.services.as_ref().and_then(|s| s.log.as_ref());
        if let Some(log) = log {
            if let Some(host) = log.host.as_deref().filter(|h| !h.is_empty()) {
                self.remote_logging.push(RemoteLogging {
                    mac: mac.clone(),
                    host: host.to_owned(),
                    port: log.port,
                });
            }
        }
    }

    /// Number of entries across the health lists (remote logging is
    /// informational and not counted).
    pub fn len(&self) -> usize {
        self.stale.len() + self.high_memory.len() + self.state_size.len() + self.broken_lan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lan_overlap(a: &str, b: &str) -> bool {
    a == b || a == LAN_WILDCARD || b == LAN_WILDCARD
}

/// Count LAN port selections that overlap a selection made by an earlier
/// interface of the same device.
pub fn lan_conflicts(config: &DeviceConfiguration) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    let mut dup_cnt = 0;

    for iface in &config.interfaces {
        let ports: Vec<&str> = iface
            .ethernet
            .iter()
            .flat_map(|e| e.select_ports.iter())
            .map(String::as_str)
            .filter(|p| p.starts_with(LAN_PREFIX))
            .collect();

        dup_cnt += ports
            .iter()
            .filter(|p| seen.iter().any(|s| lan_overlap(p, s)))
            .count();
        seen.extend(ports);
    }
    dup_cnt
}
