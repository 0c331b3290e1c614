// ── Report writer ──
//
// Writes each output table as a pretty JSON array and as CSV with a fixed
// header. Rows are serialized first and cells are looked up by column name,
// so a row lacking a declared column is an error rather than a blank cell.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;
use strum::Display;
use thiserror::Error;
use tracing::info;

use crate::model::steering_columns;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{table} row {row} has no `{column}` column")]
    MissingColumn {
        table: Table,
        column: String,
        row: usize,
    },

    #[error("{table} row {row} is not a record")]
    NotAnObject { table: Table, row: usize },

    #[error("Cannot serialize {table}: {source}")]
    Serialize {
        table: Table,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Tables ──────────────────────────────────────────────────────────

const DEVICE_COLUMNS: &[&str] = &[
    "mac", "name", "org", "venue", "model", "firmware", "uptime", "up_days",
    "cpu_busy_pct", "cpu_load_1m", "cpu_load_5m", "cpu_load_15m", "mem_used_pct",
    "mem_free_pct", "num_ifaces", "num_ssids", "num_assocs", "chan_2g", "width_2g",
    "chan_5g", "width_5g", "chan_6g", "width_6g", "conf_2g", "conf_5g", "conf_6g",
    "conf_2g_bw", "conf_5g_bw", "conf_6g_bw", "last_state", "wan_carrier",
    "wan_speed", "wan_duplex",
];

const LABEL_COLUMNS: &[&str] = &["mac", "name", "org", "venue", "model", "firmware", "band"];

const SURVEY_COLUMNS: &[&str] = &[
    "on-chan", "channel", "noise_floor", "active_ms", "busy_ms", "busy_self_ms",
    "busy_tx_ms", "last_on_chan_secs_go", "rrm_airtime_pct", "agg_15m_active_ms",
    "agg_15m_busy_ms", "agg_15m_busy_self_ms", "agg_15m_busy_tx_ms",
    "agg_15m_num_samples",
];

const NEIGHBOR_COLUMNS: &[&str] = &[
    "ssid", "bssid", "in_network", "channel", "rssi", "last_seen_secs_ago",
];

const SIGHTING_COLUMNS: &[&str] = &[
    "mac", "org", "venue", "ap_mac", "ap_name", "ap_model", "ap_fw",
];

const CLIENT_COLUMNS: &[&str] = &["mac", "org", "venue", "ap_cnt", "dups"];

const METRIC_COLUMNS: &[&str] = &[
    "connected", "band", "ssid", "connected_time", "rssi", "avg_ack_rssi", "rx_rate",
    "tx_rate", "rx_packets", "rx_bytes", "tx_packets", "tx_bytes", "vlan_id",
    "rrm_state", "rrm_bands", "rrm_active", "rrm_pps",
];

const CAPABILITY_COLUMNS: &[&str] = &[
    "rrm_cap_wnm", "rrm_cap_active", "rrm_cap_passive", "rrm_cap_table",
    "rrm_cap_link", "rrm_cap_stats",
];

/// The five output tables, named as they appear in file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Table {
    OnlineDevices,
    SurveyData,
    NeighborsData,
    ClientsByAp,
    Clients,
}

impl Table {
    /// CSV header, in output order.
    pub fn columns(self) -> Vec<String> {
        let head: &[&[&str]] = match self {
            Self::OnlineDevices => &[DEVICE_COLUMNS],
            Self::SurveyData => &[LABEL_COLUMNS, SURVEY_COLUMNS],
            Self::NeighborsData => &[LABEL_COLUMNS, NEIGHBOR_COLUMNS],
            Self::ClientsByAp => &[SIGHTING_COLUMNS, METRIC_COLUMNS],
            Self::Clients => &[CLIENT_COLUMNS, METRIC_COLUMNS],
        };
        let mut columns: Vec<String> = head.concat().into_iter().map(String::from).collect();
        if matches!(self, Self::ClientsByAp | Self::Clients) {
            columns.extend(steering_columns());
            columns.extend(CAPABILITY_COLUMNS.iter().copied().map(String::from));
        }
        columns
    }
}

// ── Encoding ────────────────────────────────────────────────────────

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".into(),
        Value::Bool(false) => "False".into(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_cell(line: &mut String, text: &str) {
    if text.contains([',', '"', '\r', '\n']) {
        line.push('"');
        line.push_str(&text.replace('"', "\"\""));
        line.push('"');
    } else {
        line.push_str(text);
    }
}

fn push_record<'a>(out: &mut String, cells: impl IntoIterator<Item = &'a str>) {
    let mut line = String::new();
    for (idx, cell) in cells.into_iter().enumerate() {
        if idx > 0 {
            line.push(',');
        }
        push_cell(&mut line, cell);
    }
    out.push_str(&line);
    out.push_str("\r\n");
}

/// Render `rows` as CSV with the table's header. Lines end in CRLF.
pub fn to_csv<T: Serialize>(table: Table, rows: &[T]) -> Result<String, ReportError> {
    let columns = table.columns();
    let mut out = String::new();
    push_record(&mut out, columns.iter().map(String::as_str));

    for (row, record) in rows.iter().enumerate() {
        let value = serde_json::to_value(record)
            .map_err(|source| ReportError::Serialize { table, source })?;
        let Value::Object(map) = value else {
            return Err(ReportError::NotAnObject { table, row });
        };
        let cells = columns
            .iter()
            .map(|column| {
                map.get(column)
                    .map(cell_text)
                    .ok_or_else(|| ReportError::MissingColumn {
                        table,
                        column: column.clone(),
                        row,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        push_record(&mut out, cells.iter().map(String::as_str));
    }
    Ok(out)
}

/// Render `rows` as a pretty-printed JSON array.
pub fn to_json<T: Serialize>(table: Table, rows: &[T]) -> Result<String, ReportError> {
    serde_json::to_string_pretty(rows).map_err(|source| ReportError::Serialize { table, source })
}

// ── Writer ──────────────────────────────────────────────────────────

/// Writes `<dir>/<DEPLOYMENT>-<YYYYmmdd-HHMMSS>-<table>.{json,csv}`.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    prefix: String,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>, deployment: &str, stamp: &DateTime<Local>) -> Self {
        Self {
            dir: dir.into(),
            prefix: format!("{}-{}", deployment.to_uppercase(), stamp.format("%Y%m%d-%H%M%S")),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, table: Table, extension: &str) -> PathBuf {
        self.dir.join(format!("{}-{table}.{extension}", self.prefix))
    }

    /// Write one table in both formats; returns the JSON and CSV paths.
    pub fn write<T: Serialize>(&self, table: Table, rows: &[T]) -> Result<Vec<PathBuf>, ReportError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ReportError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let outputs = [("json", to_json(table, rows)?), ("csv", to_csv(table, rows)?)];
        let mut written = Vec::with_capacity(outputs.len());
        for (extension, body) in outputs {
            let path = self.path(table, extension);
            std::fs::write(&path, body).map_err(|source| ReportError::Io {
                path: path.clone(),
                source,
            })?;
            written.push(path);
        }
        info!(%table, rows = rows.len(), "report written");
        Ok(written)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn client_tables_carry_steering_and_capabilities() {
        let cols = Table::ClientsByAp.columns();
        assert_eq!(cols.len(), 7 + 17 + 18 + 6);
        assert_eq!(cols[7], "connected");
        assert_eq!(cols[24], "rrm_upsteer_btm_total");
        assert_eq!(cols.last().unwrap(), "rrm_cap_stats");
        assert_eq!(Table::Clients.columns()[3], "ap_cnt");
        assert_eq!(Table::SurveyData.columns()[7], "on-chan");
        assert_eq!(Table::NeighborsData.to_string(), "neighbors-data");
    }

    #[test]
    fn csv_quotes_and_renders_cells() {
        let rows = vec![json!({
            "mac": "aa", "name": "Lobby, \"east\"", "org": null, "venue": "HQ",
            "model": "eap101", "firmware": "Shasta", "band": "5g", "ssid": "corp",
            "bssid": "00:11", "in_network": true, "channel": 36, "rssi": -61.5,
            "last_seen_secs_ago": 4
        })];
        let csv = to_csv(Table::NeighborsData, &rows).unwrap();
        let lines: Vec<&str> = csv.split("\r\n").collect();

        assert_eq!(
            lines[0],
            "mac,name,org,venue,model,firmware,band,ssid,bssid,in_network,channel,rssi,last_seen_secs_ago"
        );
        assert_eq!(
            lines[1],
            "aa,\"Lobby, \"\"east\"\"\",,HQ,eap101,Shasta,5g,corp,00:11,True,36,-61.5,4"
        );
        assert_eq!(lines[2], "");
    }

    #[test]
    fn missing_column_is_an_error() {
        let rows = vec![json!({ "mac": "aa" })];
        let err = to_csv(Table::OnlineDevices, &rows).unwrap_err();
        assert!(matches!(
            err,
            ReportError::MissingColumn { ref column, row: 0, .. } if column == "name"
        ));
    }

    #[test]
    fn writer_names_files_by_deployment_and_time() {
        let dir = tempfile::tempdir().unwrap();
        let stamp = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let writer = ReportWriter::new(dir.path(), "lab", &stamp);

        let rows: Vec<Value> = Vec::new();
        let paths = writer.write(Table::Clients, &rows).unwrap();
        assert_eq!(
            paths[0].file_name().unwrap().to_str().unwrap(),
            "LAB-20240309-070501-clients.json"
        );
        assert_eq!(std::fs::read_to_string(&paths[0]).unwrap(), "[]");
        assert!(
            std::fs::read_to_string(&paths[1])
                .unwrap()
                .starts_with("mac,org,venue,ap_cnt,dups,connected,")
        );
    }
}
