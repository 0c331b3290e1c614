//! File-backed configuration for owfleet.
//!
//! Run settings come from built-in defaults, then `owfleet.toml` in the
//! config directory, then `OWFLEET_*` environment variables. Deployment
//! topology (`clouds.json`) and login credentials (`PRIV-creds.json`) are
//! JSON maps keyed by deployment name. Everything funnels into
//! `owfleet_core::DeploymentConfig` and `owfleet_core::CollectOptions`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use owfleet_api::{Service, ServiceEndpoint};
use owfleet_core::{
    CollectOptions, DeploymentConfig, FetchSettings, LoginCredentials, RetryPolicy,
    StatsFailurePolicy, Thresholds, TlsVerification, TokenPolicy,
};

/// Settings file looked up in the config directory.
pub const SETTINGS_FILE: &str = "owfleet.toml";

/// Overrides config directory discovery.
pub const CONFIG_DIR_ENV: &str = "OWFLEET_CONFIG_DIR";

const REQUIRED_SERVICES: [Service; 3] = [Service::Security, Service::Gateway, Service::Provisioning];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} not found", path.display())]
    MissingFile { path: PathBuf },

    #[error("deployment '{name}' not found in {}", path.display())]
    UnknownDeployment { name: String, path: PathBuf },

    #[error("no credentials for deployment '{name}' in {}", path.display())]
    MissingCredentials { name: String, path: PathBuf },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize settings: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Settings ────────────────────────────────────────────────────────

/// Tunables for every run, as found in `owfleet.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Deployment topology, relative to the config directory.
    pub topology_file: String,
    /// Login credentials, relative to the config directory.
    pub credentials_file: String,
    /// Bearer token cache, relative to the config directory.
    pub token_cache_file: String,

    pub cache_dir: PathBuf,
    pub results_dir: PathBuf,
    pub cache_ttl_secs: u64,

    pub page_size: u32,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,

    /// Accept any server certificate.
    pub insecure: bool,
    pub ca_cert: Option<PathBuf>,

    /// Ignore the token cache and always log in.
    pub fresh_login: bool,
    pub firmware_marker: String,

    pub stats: StatsSettings,
    pub thresholds: ThresholdSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            topology_file: "clouds.json".into(),
            credentials_file: "PRIV-creds.json".into(),
            token_cache_file: "PRIV-auth-cache.json".into(),
            cache_dir: PathBuf::from("cache"),
            results_dir: PathBuf::from("results"),
            cache_ttl_secs: 120,
            page_size: 75,
            request_delay_ms: 200,
            timeout_secs: 30,
            insecure: false,
            ca_cert: None,
            fresh_login: false,
            firmware_marker: "Shasta".into(),
            stats: StatsSettings::default(),
            thresholds: ThresholdSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StatsSettings {
    pub attempts: u32,
    pub backoff_ms: u64,
    /// Drop devices whose stats cannot be loaded instead of aborting.
    pub skip_failed: bool,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 200,
            skip_failed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdSettings {
    pub stale_secs: i64,
    pub memory_pct: f64,
    pub state_size_min: usize,
    pub state_size_max: usize,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        let t = Thresholds::default();
        Self {
            stale_secs: t.stale_secs,
            memory_pct: t.memory_pct,
            state_size_min: t.state_size_min,
            state_size_max: t.state_size_max,
        }
    }
}

impl Settings {
    /// Render as TOML, e.g. for `config show`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn tls(&self) -> TlsVerification {
        if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca) = self.ca_cert {
            TlsVerification::CustomCa(ca.clone())
        } else {
            TlsVerification::SystemDefaults
        }
    }

    /// `<results_dir>/<DEPLOYMENT>`
    pub fn results_dir_for(&self, deployment: &str) -> PathBuf {
        self.results_dir.join(deployment.to_uppercase())
    }

    /// Per-run options with no org/venue filter.
    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            org: None,
            venue: None,
            use_cache: false,
            stats_policy: if self.stats.skip_failed {
                StatsFailurePolicy::SkipDevice
            } else {
                StatsFailurePolicy::Abort
            },
            stats_retry: RetryPolicy {
                attempts: self.stats.attempts,
                backoff: Duration::from_millis(self.stats.backoff_ms),
            },
            thresholds: Thresholds {
                stale_secs: self.thresholds.stale_secs,
                memory_pct: self.thresholds.memory_pct,
                state_size_min: self.thresholds.state_size_min,
                state_size_max: self.thresholds.state_size_max,
            },
            firmware_marker: self.firmware_marker.clone(),
        }
    }
}

// ── Config directory ────────────────────────────────────────────────

/// Resolve the config directory.
///
/// Order: `explicit`, then `$OWFLEET_CONFIG_DIR`, then `./config` when it
/// exists, then the platform config directory.
pub fn resolve_config_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    let local = PathBuf::from("config");
    if local.is_dir() {
        return local;
    }
    ProjectDirs::from("org", "owfleet", "owfleet")
        .map_or(local, |dirs| dirs.config_dir().to_path_buf())
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load settings for `config_dir` from defaults, file and environment.
///
/// Nested keys use a double underscore in the environment, e.g.
/// `OWFLEET_STATS__ATTEMPTS=5`.
pub fn load_settings(config_dir: &Path) -> Result<Settings, ConfigError> {
    let settings: Settings = Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(config_dir.join(SETTINGS_FILE)))
        .merge(Env::prefixed("OWFLEET_").split("__"))
        .extract()?;

    if settings.page_size == 0 {
        return Err(ConfigError::Validation {
            field: "page_size".into(),
            reason: "must be at least 1".into(),
        });
    }
    Ok(settings)
}

/// Service endpoints per deployment, keyed by upper-cased deployment name.
pub type Topology = BTreeMap<String, BTreeMap<String, ServiceEndpoint>>;

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialEntry {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub password: SecretString,
}

fn load_json_map<T: for<'de> Deserialize<'de>>(
    path: &Path,
) -> Result<BTreeMap<String, T>, ConfigError> {
    let map: BTreeMap<String, T> = Figment::from(Json::file(path)).extract()?;
    Ok(map
        .into_iter()
        .map(|(name, value)| (name.to_uppercase(), value))
        .collect())
}

/// Read the topology file. A missing file is an error.
pub fn load_topology(path: &Path) -> Result<Topology, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    load_json_map(path)
}

/// Read the credentials file. A missing file means no credentials.
pub fn load_credentials(path: &Path) -> Result<BTreeMap<String, CredentialEntry>, ConfigError> {
    if !path.is_file() {
        return Ok(BTreeMap::new());
    }
    load_json_map(path)
}

/// Build the runtime config for `deployment`.
///
/// Credentials are optional unless `settings.fresh_login` forces a login;
/// otherwise a cached token may stand in for them.
pub fn deployment_config(
    config_dir: &Path,
    settings: &Settings,
    deployment: &str,
) -> Result<DeploymentConfig, ConfigError> {
    let name = deployment.to_uppercase();
    let topology_path = config_dir.join(&settings.topology_file);
    let mut topology = load_topology(&topology_path)?;
    let entry = topology
        .remove(&name)
        .ok_or_else(|| ConfigError::UnknownDeployment {
            name: name.clone(),
            path: topology_path.clone(),
        })?;

    let services: HashMap<Service, ServiceEndpoint> = entry
        .into_iter()
        .filter_map(|(svc, ep)| Service::from_name(&svc).map(|s| (s, ep)))
        .collect();
    if let Some(missing) = REQUIRED_SERVICES.iter().find(|s| !services.contains_key(s)) {
        return Err(ConfigError::Validation {
            field: missing.as_str().into(),
            reason: format!("service missing for deployment {name} in {}", topology_path.display()),
        });
    }

    let credentials_path = config_dir.join(&settings.credentials_file);
    let credentials = load_credentials(&credentials_path)?
        .remove(&name)
        .map(|c| LoginCredentials {
            user_id: c.user_id,
            password: c.password,
        });
    if credentials.is_none() && settings.fresh_login {
        return Err(ConfigError::MissingCredentials {
            name,
            path: credentials_path,
        });
    }

    let mut config = DeploymentConfig::new(&name, services);
    config.credentials = credentials;
    config.tls = settings.tls();
    config.timeout = Duration::from_secs(settings.timeout_secs);
    config.token_cache = config_dir.join(&settings.token_cache_file);
    config.token_policy = if settings.fresh_login {
        TokenPolicy::AlwaysLogin
    } else {
        TokenPolicy::Reuse
    };
    config.cache_dir.clone_from(&settings.cache_dir);
    config.cache_ttl = Duration::from_secs(settings.cache_ttl_secs);
    config.fetch = FetchSettings {
        page_size: settings.page_size,
        request_delay: Duration::from_millis(settings.request_delay_ms),
    };
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const TOPOLOGY: &str = r#"{
        "lab": {
            "owsec":  { "host": "sec.lab.example.com",  "port": 16001 },
            "owgw":   { "host": "gw.lab.example.com",   "port": 16002 },
            "owprov": { "host": "prov.lab.example.com", "port": 16005 },
            "owfms":  { "host": "fms.lab.example.com",  "port": 16004 }
        },
        "EDGE": {
            "owsec": { "host": "sec.edge.example.com", "port": 16001 }
        }
    }"#;

    fn config_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clouds.json"), TOPOLOGY).unwrap();
        std::fs::write(
            dir.path().join("PRIV-creds.json"),
            r#"{ "LAB": { "userId": "ops@example.com", "password": "hunter2" } }"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn settings_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            "page_size = 50\n[stats]\nattempts = 5\n[thresholds]\nmemory_pct = 90.0\n",
        )
        .unwrap();

        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.stats.attempts, 5);
        assert_eq!(settings.stats.backoff_ms, 200);
        assert_eq!(settings.cache_ttl_secs, 120);

        let opts = settings.collect_options();
        assert!((opts.thresholds.memory_pct - 90.0).abs() < f64::EPSILON);
        assert_eq!(opts.stats_policy, StatsFailurePolicy::Abort);
    }

    #[test]
    fn deployment_resolves_services_and_credentials() {
        let dir = config_dir();
        let settings = Settings::default();
        let cfg = deployment_config(dir.path(), &settings, "Lab").unwrap();

        assert_eq!(cfg.name, "LAB");
        assert_eq!(cfg.services.len(), 3);
        assert_eq!(cfg.services[&Service::Gateway].port, 16002);
        let creds = cfg.credentials.unwrap();
        assert_eq!(creds.user_id, "ops@example.com");
        assert_eq!(creds.password.expose_secret(), "hunter2");
        assert_eq!(cfg.token_cache, dir.path().join("PRIV-auth-cache.json"));
        assert_eq!(cfg.token_policy, TokenPolicy::Reuse);
        assert_eq!(cfg.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn unknown_deployment_and_missing_topology() {
        let dir = config_dir();
        let settings = Settings::default();
        assert!(matches!(
            deployment_config(dir.path(), &settings, "prod"),
            Err(ConfigError::UnknownDeployment { ref name, .. }) if name == "PROD"
        ));

        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(
            deployment_config(empty.path(), &settings, "lab"),
            Err(ConfigError::MissingFile { .. })
        ));
    }

    #[test]
    fn incomplete_topology_is_rejected() {
        let dir = config_dir();
        let err = deployment_config(dir.path(), &Settings::default(), "edge").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "owgw"));
    }

    #[test]
    fn fresh_login_requires_credentials() {
        let dir = config_dir();
        std::fs::remove_file(dir.path().join("PRIV-creds.json")).unwrap();

        let mut settings = Settings::default();
        let cfg = deployment_config(dir.path(), &settings, "lab").unwrap();
        assert!(cfg.credentials.is_none());

        settings.fresh_login = true;
        assert!(matches!(
            deployment_config(dir.path(), &settings, "lab"),
            Err(ConfigError::MissingCredentials { .. })
        ));
    }

    #[test]
    fn insecure_wins_over_ca_cert() {
        let settings = Settings {
            insecure: true,
            ca_cert: Some(PathBuf::from("ca.pem")),
            ..Settings::default()
        };
        assert_eq!(settings.tls(), TlsVerification::DangerAcceptInvalid);
        assert_eq!(
            settings.results_dir_for("lab"),
            PathBuf::from("results").join("LAB")
        );
    }
}
