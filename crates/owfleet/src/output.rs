//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line. The
//! end-of-run health report is rendered here too.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use owfleet_core::{DeviceInfo, RunSummary};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single item; `detail_fn` supplies the table-mode text.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(out)
}

fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}

// ── Run report ───────────────────────────────────────────────────────

/// How the end-of-run report is laid out.
#[derive(Debug, Clone, Copy)]
pub struct ReportStyle {
    pub color: bool,
    /// List every remote logging host instead of a count.
    pub expand: bool,
    pub memory_pct: f64,
}

struct Painter {
    color: bool,
}

impl Painter {
    fn title(&self, text: &str) -> String {
        if self.color {
            text.bold().cyan().to_string()
        } else {
            text.to_owned()
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text.to_owned()
        }
    }

    fn error(&self, text: &str) -> String {
        if self.color {
            text.red().bold().to_string()
        } else {
            text.to_owned()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_owned()
        }
    }
}

fn place(info: &DeviceInfo) -> String {
    format!("({info})")
}

/// Human-readable run report: counts, written files, payload diagnostics
/// and every warning, each flagged device shown as `entity => venue => name`.
pub fn render_run_report(summary: &RunSummary, files: &[PathBuf], style: ReportStyle) -> String {
    let p = Painter { color: style.color };
    let mut lines = Vec::new();

    let connected = summary
        .connection
        .as_ref()
        .map_or_else(|| "?".to_owned(), |c| c.connected_devices.to_string());
    lines.push(format!(
        "There are {} total clients across the {connected} connected devices",
        summary.total_clients
    ));
    lines.push(format!(
        "   -> {} of them are currently connected",
        summary.connected_clients
    ));
    lines.push(String::new());
    lines.push(p.title(&format!(
        "[{}] Processed {} online devices out of {} total",
        summary.deployment, summary.processed, summary.total_devices
    )));
    for file in files {
        lines.push(p.dim(&format!("   -> {}", file.display())));
    }

    if !summary.skipped.is_empty() {
        lines.push(p.warning(&format!(
            "   -> WARNING: Skipped {} devices without statistics:",
            summary.skipped.len()
        )));
        for info in &summary.skipped {
            lines.push(format!("       -> {} {}", info.mac, place(info)));
        }
    }

    lines.push(String::new());
    lines.push(p.title("Information, warnings, and errors detected:"));

    let payload = &summary.payload;
    lines.push("   -> State Size Info:".to_owned());
    if let Some(min) = &payload.min {
        lines.push(format!(
            "        Min: {:>6} bytes (MAC: {}, {})",
            min.finding.bytes, min.finding.mac, min.device
        ));
    }
    if let Some(max) = &payload.max {
        lines.push(format!(
            "        Max: {:>6} bytes (MAC: {}, {})",
            max.finding.bytes, max.finding.mac, max.device
        ));
    }
    lines.push(format!("        Avg: {:>6.0} bytes", payload.avg_bytes));
    lines.push(format!(
        "        Fetch: min {} ms, max {} ms, avg {} ms over {} samples",
        payload.min_ms, payload.max_ms, payload.avg_ms, payload.samples
    ));

    if !summary.state_size.is_empty() {
        lines.push(p.warning(&format!(
            "   -> WARNING: Found {} devices with state size outside of warning thresholds:",
            summary.state_size.len()
        )));
        for f in &summary.state_size {
            lines.push(format!(
                "       -> {} state size is {:>6} bytes {}",
                f.finding.mac,
                f.finding.bytes,
                place(&f.device)
            ));
        }
    }

    if !summary.high_memory.is_empty() {
        lines.push(p.warning(&format!(
            "   -> WARNING: Found {} devices with memory > {}%:",
            summary.high_memory.len(),
            style.memory_pct
        )));
        for f in &summary.high_memory {
            lines.push(format!(
                "       -> {} mem usage is {:.0}% {}",
                f.finding.mac,
                f.finding.mem_used_pct,
                place(&f.device)
            ));
        }
    }

    if !summary.stale.is_empty() {
        lines.push(p.warning(&format!(
            "   -> WARNING: Found {} devices with stale stats:",
            summary.stale.len()
        )));
        for f in &summary.stale {
            lines.push(format!(
                "       -> {} last updated {} seconds ago {}",
                f.finding.mac,
                f.finding.last_state,
                place(&f.device)
            ));
        }
    }

    if !summary.remote_logging.is_empty() {
        lines.push(p.warning(&format!(
            "   -> WARNING: There are {} devices remote logging",
            summary.remote_logging.len()
        )));
        if style.expand {
            for f in &summary.remote_logging {
                let target = match f.finding.port {
                    Some(port) => format!("{}:{port}", f.finding.host),
                    None => f.finding.host.clone(),
                };
                lines.push(format!(
                    "       -> {} logging to {target} {}",
                    f.finding.mac,
                    place(&f.device)
                ));
            }
        }
    }

    if !summary.broken_lan.is_empty() {
        lines.push(p.error(&format!(
            "   -> ERROR: Found {} devices with broken LAN config:",
            summary.broken_lan.len()
        )));
        for f in &summary.broken_lan {
            lines.push(format!(
                "       -> {} has LAN duplicated {} times {}",
                f.finding.mac,
                f.finding.dup_cnt,
                place(&f.device)
            ));
        }
    }

    lines.join("\n")
}
