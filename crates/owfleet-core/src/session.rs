// ── Session / authentication ──
//
// Opens an authenticated `CloudClient` for a deployment, reusing the
// disk-cached bearer token when the policy allows.

use owfleet_api::{CloudClient, TransportConfig};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::cache::TokenCache;
use crate::config::{DeploymentConfig, TokenPolicy};
use crate::error::CoreError;

/// An authenticated connection to one deployment.
pub struct Session {
    deployment: String,
    client: CloudClient,
}

impl Session {
    /// Authenticate against the deployment described by `config`.
    ///
    /// A missing service topology or missing credentials (when a login is
    /// needed) fail with [`CoreError::Config`] before any request is sent.
    pub async fn open(config: &DeploymentConfig) -> Result<Self, CoreError> {
        if config.services.is_empty() {
            return Err(CoreError::Config {
                message: format!("deployment {} has no services configured", config.name),
            });
        }

        let transport = TransportConfig {
            tls: (&config.tls).into(),
            timeout: config.timeout,
        };
        let client = CloudClient::new(&config.services, &transport)?;
        Self::authenticate(config, client).await
    }

    /// Authenticate an already-built client.
    pub async fn authenticate(
        config: &DeploymentConfig,
        mut client: CloudClient,
    ) -> Result<Self, CoreError> {
        let mut cache = TokenCache::load(&config.token_cache);

        let cached = match config.token_policy {
            TokenPolicy::Reuse => cache.get(&config.name),
            TokenPolicy::AlwaysLogin => None,
        };

        let token = if let Some(token) = cached {
            debug!(deployment = %config.name, "reusing cached token");
            token
        } else {
            let creds = config.credentials.as_ref().ok_or_else(|| CoreError::Config {
                message: format!("no login credentials for deployment {}", config.name),
            })?;
            let token = client.login(&creds.user_id, &creds.password).await?;
            cache.insert(&config.name, &token);
            cache.save()?;
            token
        };

        info!(
            deployment = %config.name,
            "authenticated using token '{}xxxxx..'",
            token_prefix(&token)
        );
        client.set_token(token);

        Ok(Self {
            deployment: config.name.clone(),
            client,
        })
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    pub fn client(&self) -> &CloudClient {
        &self.client
    }
}

/// The first 8 characters of a token; never more.
fn token_prefix(token: &SecretString) -> String {
    token.expose_secret().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_prefix_is_eight_chars() {
        let token = SecretString::from("abcdefghijklmnop".to_string());
        assert_eq!(token_prefix(&token), "abcdefgh");
        let short = SecretString::from("abc".to_string());
        assert_eq!(token_prefix(&short), "abc");
    }
}
