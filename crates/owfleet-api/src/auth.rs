// Security service login
//
// `POST /api/v1/oauth2` on owsec exchanges a user id and password for an
// opaque bearer token. The token carries no expiry information that we use.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::client::{CloudClient, Service};
use crate::error::Error;
use crate::models::LoginResponse;

impl CloudClient {
    /// Log in and return the bearer token.
    ///
    /// The token is not installed on the client; callers decide whether to
    /// cache it first and then call [`CloudClient::set_token`].
    pub async fn login(&self, user_id: &str, password: &SecretString) -> Result<SecretString, Error> {
        debug!(user_id, "logging in to security service");

        let body = json!({
            "userId": user_id,
            "password": password.expose_secret(),
        });

        let resp: LoginResponse = self
            .post(Service::Security, "/api/v1/oauth2", &body)
            .await
            .map_err(|e| match e {
                Error::Api { status, message, .. } if status == 403 || status == 400 => {
                    Error::Authentication {
                        message: format!("login rejected (HTTP {status}): {message}"),
                    }
                }
                other => other,
            })?;

        resp.access_token
            .filter(|t| !t.is_empty())
            .map(SecretString::from)
            .ok_or(Error::MissingToken)
    }
}
