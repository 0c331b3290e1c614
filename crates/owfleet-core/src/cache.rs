// ── Disk caches ──
//
// `DataCache`: named JSON blobs per deployment, fresh while the file's
// mtime is younger than the TTL. `TokenCache`: one bearer token per
// deployment in a single JSON map. Neither takes locks; one process per
// deployment at a time.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use indexmap::IndexMap;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::CoreError;

// ── Data cache ──────────────────────────────────────────────────────

/// TTL cache of listing results, one file per `(deployment, name)`.
#[derive(Debug, Clone)]
pub struct DataCache {
    dir: PathBuf,
    deployment: String,
    ttl: Duration,
}

impl DataCache {
    pub fn new(dir: impl Into<PathBuf>, deployment: &str, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            deployment: deployment.to_uppercase(),
            ttl,
        }
    }

    /// `<dir>/<DEPLOYMENT>-<name>.json`
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}-{name}.json", self.deployment))
    }

    /// Load `name` if the file exists, is younger than the TTL, and parses.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let path = self.path(name);
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        // An mtime in the future counts as age zero.
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age >= self.ttl {
            debug!(path = %path.display(), age_secs = age.as_secs(), "cache entry expired");
            return None;
        }

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable cache entry");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(value) => {
                debug!(path = %path.display(), "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cache entry ignored");
                None
            }
        }
    }

    /// Write `name`, creating the cache directory if needed.
    pub fn store<T: Serialize>(&self, name: &str, data: &T) -> Result<(), CoreError> {
        let path = self.path(name);
        std::fs::create_dir_all(&self.dir).map_err(|e| cache_error(&self.dir, &e))?;
        let json = serde_json::to_string(data).map_err(|e| CoreError::Cache {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| cache_error(&path, &e))?;
        debug!(path = %path.display(), "cache entry written");
        Ok(())
    }

    /// Return the cached `name` when fresh; otherwise run `fetch` and cache
    /// its result. A failed write is logged, not returned.
    pub async fn load_or_fetch<T, F, Fut>(&self, name: &str, fetch: F) -> Result<T, CoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        if let Some(hit) = self.load(name) {
            info!(name, "loaded from cache");
            return Ok(hit);
        }
        self.refresh(name, fetch).await
    }

    /// Run `fetch` unconditionally and cache its result.
    pub async fn refresh<T, F, Fut>(&self, name: &str, fetch: F) -> Result<T, CoreError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let data = fetch().await?;
        if let Err(e) = self.store(name, &data) {
            warn!(name, error = %e, "failed to write cache entry");
        }
        Ok(data)
    }
}

fn cache_error(path: &Path, err: &std::io::Error) -> CoreError {
    CoreError::Cache {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

// ── Token cache ─────────────────────────────────────────────────────

/// `{"<DEPLOYMENT>": "<token>", ...}` on disk. Entries for other
/// deployments are preserved on save.
#[derive(Debug)]
pub struct TokenCache {
    path: PathBuf,
    entries: IndexMap<String, String>,
}

impl TokenCache {
    /// Load the cache file. A missing file is an empty cache; a corrupt one
    /// is logged and treated as empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "corrupt token cache ignored");
                IndexMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable token cache ignored");
                IndexMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn get(&self, deployment: &str) -> Option<SecretString> {
        self.entries
            .get(deployment)
            .filter(|t| !t.is_empty())
            .map(|t| SecretString::from(t.clone()))
    }

    pub fn insert(&mut self, deployment: &str, token: &SecretString) {
        self.entries
            .insert(deployment.to_owned(), token.expose_secret().to_owned());
    }

    pub fn save(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| cache_error(parent, &e))?;
        }
        let json = serde_json::to_string(&self.entries).map_err(|e| CoreError::Cache {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, json).map_err(|e| cache_error(&self.path, &e))
    }
}
