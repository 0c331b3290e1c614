// ── Runtime deployment configuration ──
//
// These types describe which deployment to talk to and how a collection run
// behaves. They carry credential data and tuning, but never touch disk.
// The CLI builds a `DeploymentConfig` from its config files and hands it in.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use owfleet_api::{Service, ServiceEndpoint, TlsMode};
use secrecy::SecretString;

/// Login credentials for the security service.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub user_id: String,
    pub password: SecretString,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (lab deployments with self-signed certs).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Whether a cached bearer token may be reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TokenPolicy {
    /// Use the cached token when one exists; log in otherwise.
    #[default]
    Reuse,
    /// Always log in and overwrite the cached token.
    AlwaysLogin,
}

/// What a run does when a device's statistics cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatsFailurePolicy {
    /// Abort the whole run with `CoreError::StatsUnavailable`.
    #[default]
    Abort,
    /// Drop the device from this run and keep going.
    SkipDevice,
}

/// Fixed-backoff retry for per-device statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Health-check thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Seconds since the device's last state before it counts as stale.
    pub stale_secs: i64,
    /// Memory use percentage above which a device is flagged.
    pub memory_pct: f64,
    /// Inclusive range of acceptable statistics payload sizes, in bytes.
    pub state_size_min: usize,
    pub state_size_max: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            stale_secs: 120,
            memory_pct: 80.0,
            state_size_min: 3000,
            state_size_max: 200_000,
        }
    }
}

/// Paging and throttling for bulk listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub page_size: u32,
    /// Pause between consecutive pages and between per-device fetches.
    pub request_delay: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_size: 75,
            request_delay: Duration::from_millis(200),
        }
    }
}

/// Configuration for one cloud SDK deployment.
///
/// Built by the CLI, passed to [`Session::open`](crate::Session::open);
/// core never reads config files.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    /// Deployment name, upper-cased.
    pub name: String,
    pub services: HashMap<Service, ServiceEndpoint>,
    /// `None` when the credentials file has no entry; only needed to log in.
    pub credentials: Option<LoginCredentials>,
    pub tls: TlsVerification,
    pub timeout: Duration,
    pub token_cache: PathBuf,
    pub token_policy: TokenPolicy,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub fetch: FetchSettings,
}

impl DeploymentConfig {
    /// A config with defaults for everything but the name and services.
    pub fn new(name: &str, services: HashMap<Service, ServiceEndpoint>) -> Self {
        Self {
            name: name.to_uppercase(),
            services,
            credentials: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            token_cache: PathBuf::from("config/PRIV-auth-cache.json"),
            token_policy: TokenPolicy::default(),
            cache_dir: PathBuf::from("cache"),
            cache_ttl: Duration::from_secs(120),
            fetch: FetchSettings::default(),
        }
    }
}

/// Options for one `collect` run.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Case-insensitive organization filter.
    pub org: Option<String>,
    /// Case-insensitive venue filter.
    pub venue: Option<String>,
    /// Serve device and provisioning listings from the disk cache when fresh.
    pub use_cache: bool,
    pub stats_policy: StatsFailurePolicy,
    pub stats_retry: RetryPolicy,
    pub thresholds: Thresholds,
    /// Firmware strings are trimmed to start at this marker.
    pub firmware_marker: String,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            org: None,
            venue: None,
            use_cache: false,
            stats_policy: StatsFailurePolicy::default(),
            stats_retry: RetryPolicy::default(),
            thresholds: Thresholds::default(),
            firmware_marker: "Shasta".into(),
        }
    }
}
