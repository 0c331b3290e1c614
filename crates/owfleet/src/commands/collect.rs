//! `owfleet collect`: one full telemetry run.

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use owfleet_core::{ReportWriter, RunSummary, StatsFailurePolicy};

use crate::cli::{CollectArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, ReportStyle};

use super::util;

/// Structured form of the run report for `--output json|yaml`.
#[derive(Serialize)]
struct CollectReport<'a> {
    summary: &'a RunSummary,
    files: &'a [PathBuf],
}

pub async fn handle(args: CollectArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (workspace, config, session) = util::open_session(global, &args.deployment).await?;

    let mut options = workspace.settings.collect_options();
    options.org = args.filter.org;
    options.venue = args.filter.venue;
    options.use_cache = args.cached;
    if args.skip_failed_stats {
        options.stats_policy = StatsFailurePolicy::SkipDevice;
    }

    let run = owfleet_core::collect(&session, &config, &options).await?;

    let outdir = args
        .outdir
        .unwrap_or_else(|| workspace.settings.results_dir_for(&config.name));
    let writer = ReportWriter::new(outdir, &config.name, &run.started);
    let files = run.write_reports(&writer)?;
    info!(dir = %writer.dir().display(), files = files.len(), "reports written");

    let style = ReportStyle {
        color: output::should_color(global.color),
        expand: args.expand,
        memory_pct: options.thresholds.memory_pct,
    };
    let report = CollectReport {
        summary: &run.summary,
        files: &files,
    };
    let out = output::render_single(
        global.output,
        &report,
        |r| output::render_run_report(r.summary, r.files, style),
        |r| {
            r.files
                .iter()
                .map(|f| f.display().to_string())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
