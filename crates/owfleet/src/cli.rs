//! Clap derive structures for the `owfleet` CLI.
//!
//! Defines the command tree and global flags. This file is also compiled by
//! `build.rs` for man page generation, so it depends on clap alone.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// owfleet -- OpenWiFi cloud telemetry collector
#[derive(Debug, Parser)]
#[command(
    name = "owfleet",
    version,
    about = "Collect device telemetry from OpenWiFi cloud deployments",
    long_about = "Pulls the online device list, per-device last state and provisioning\n\
        data from an OpenWiFi cloud deployment, and writes device, survey,\n\
        neighbor and client tables as JSON and CSV with a health summary.",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Directory holding clouds.json, PRIV-creds.json and owfleet.toml
    #[arg(long, env = "OWFLEET_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Output format for summaries and listings
    #[arg(long, env = "OWFLEET_OUTPUT", default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// HTTP request timeout in seconds (overrides owfleet.toml)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables and summaries (default)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Color when stdout is a terminal and NO_COLOR is unset
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect online device statistics and write reports
    #[command(alias = "c")]
    Collect(CollectArgs),

    /// List provisioned devices addressable by org and venue
    #[command(alias = "t")]
    Targets(TargetsArgs),

    /// Send commands to a single device
    #[command(alias = "dev")]
    Device(DeviceArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// Deployment selection shared by every networked command.
#[derive(Debug, Args)]
pub struct DeploymentArgs {
    /// Deployment name as listed in clouds.json
    #[arg(long, short = 'd', env = "OWFLEET_DEPLOYMENT")]
    pub deployment: String,

    /// Ignore the cached token and log in again
    #[arg(long)]
    pub fresh_login: bool,
}

/// Org and venue filters, matched against provisioning names.
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Only devices of this organization (entity name)
    #[arg(long, short = 'o')]
    pub org: Option<String>,

    /// Only devices in this venue
    #[arg(long, short = 'V')]
    pub venue: Option<String>,
}

// ── Collect ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CollectArgs {
    #[command(flatten)]
    pub deployment: DeploymentArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Output directory (default: <results_dir>/<DEPLOYMENT>)
    #[arg(long, short = 'O')]
    pub outdir: Option<PathBuf>,

    /// Print expanded diagnostics, including remote logging hosts
    #[arg(long, short = 'e')]
    pub expand: bool,

    /// Serve device and provisioning listings from the disk cache when fresh
    #[arg(long)]
    pub cached: bool,

    /// Skip devices whose statistics cannot be loaded instead of aborting
    #[arg(long)]
    pub skip_failed_stats: bool,
}

// ── Targets ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TargetsArgs {
    #[command(flatten)]
    pub deployment: DeploymentArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Include disconnected devices
    #[arg(long)]
    pub all: bool,

    /// Serve listings from the disk cache when fresh
    #[arg(long)]
    pub cached: bool,
}

// ── Device ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DeviceArgs {
    #[command(subcommand)]
    pub command: DeviceCommand,
}

#[derive(Debug, Subcommand)]
pub enum DeviceCommand {
    /// Run a shell script on a device
    Script(ScriptArgs),

    /// Upgrade device firmware from a URI
    Upgrade(UpgradeArgs),

    /// Show the state of a previously queued command
    Status(StatusArgs),
}

#[derive(Debug, Args)]
pub struct ScriptArgs {
    #[command(flatten)]
    pub deployment: DeploymentArgs,

    /// Device MAC (serial number)
    pub mac: String,

    /// Script file to upload; base64-encoded before sending
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    /// Queue the script until the device next connects
    #[arg(long)]
    pub deferred: bool,
}

#[derive(Debug, Args)]
pub struct UpgradeArgs {
    #[command(flatten)]
    pub deployment: DeploymentArgs,

    /// Device MAC (serial number)
    pub mac: String,

    /// Firmware image URI
    #[arg(long)]
    pub uri: String,

    /// Drop the redirector setting during the upgrade
    #[arg(long)]
    pub no_keep_redirector: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub deployment: DeploymentArgs,

    /// Device MAC (serial number)
    pub mac: String,

    /// Command UUID returned by `script` or `upgrade`
    pub uuid: String,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective settings (defaults, owfleet.toml, environment)
    Show,

    /// Print the resolved config directory and file locations
    Path,

    /// List deployments found in the topology file
    Deployments,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
