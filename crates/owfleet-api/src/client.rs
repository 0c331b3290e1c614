// Cloud SDK HTTP client
//
// Wraps `reqwest::Client` with per-service base URLs, bearer-token auth,
// and the SDK's error envelope. Endpoint groups (devices, provisioning,
// commands) are inherent methods in sibling modules so this file stays
// focused on transport mechanics.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Error shape returned by the SDK services on non-2xx responses.
#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default, rename = "ErrorCode")]
    code: Option<i64>,
    #[serde(default, rename = "ErrorDescription")]
    description: Option<String>,
}

// ── Services ─────────────────────────────────────────────────────────

/// A backend micro-service of a cloud SDK deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// `owsec`: security / login.
    Security,
    /// `owgw`: gateway, device state and commands.
    Gateway,
    /// `owprov`: provisioning (inventory, venues, entities).
    Provisioning,
}

impl Service {
    /// The name used for this service in the deployment topology file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "owsec",
            Self::Gateway => "owgw",
            Self::Provisioning => "owprov",
        }
    }

    /// Parse a topology key. Unknown services are ignored by callers.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "owsec" => Some(Self::Security),
            "owgw" => Some(Self::Gateway),
            "owprov" => Some(Self::Provisioning),
            _ => None,
        }
    }
}

/// Where one service of a deployment listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub host: String,
    pub port: u16,
    /// Defaults to `https`; plain `http` is only useful against local mocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

impl ServiceEndpoint {
    /// The service root, e.g. `https://sec.example.com:16001/`.
    pub fn base_url(&self) -> Result<Url, Error> {
        let scheme = self.scheme.as_deref().unwrap_or("https");
        Ok(Url::parse(&format!("{scheme}://{}:{}/", self.host, self.port))?)
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Raw HTTP client for one deployment's cloud SDK services.
///
/// Every request after login carries `Authorization: Bearer <token>`.
/// Methods return decoded payloads; HTTP and SDK error envelopes are
/// turned into [`Error`] before the caller sees them.
pub struct CloudClient {
    http: reqwest::Client,
    services: HashMap<Service, Url>,
    token: Option<SecretString>,
}

impl CloudClient {
    /// Create a client for the given service endpoints.
    pub fn new(
        endpoints: &HashMap<Service, ServiceEndpoint>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, endpoints)
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        endpoints: &HashMap<Service, ServiceEndpoint>,
    ) -> Result<Self, Error> {
        let services = endpoints
            .iter()
            .map(|(svc, ep)| Ok((*svc, ep.base_url()?)))
            .collect::<Result<HashMap<_, _>, Error>>()?;
        Ok(Self {
            http,
            services,
            token: None,
        })
    }

    /// Install the bearer token used on every subsequent request.
    pub fn set_token(&mut self, token: SecretString) {
        debug!("bearer token installed");
        self.token = Some(token);
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for `path` on the given service.
    pub(crate) fn service_url(&self, svc: Service, path: &str) -> Result<Url, Error> {
        let base = self
            .services
            .get(&svc)
            .ok_or(Error::UnknownService(svc.as_str()))?;
        Ok(base.join(path.trim_start_matches('/'))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a GET and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        svc: Service,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let body = self.get_text(svc, path, params).await?;
        decode(body)
    }

    /// Send a GET and return the raw body text.
    ///
    /// Used where the caller needs the payload size as well as its content.
    pub(crate) async fn get_text(
        &self,
        svc: Service,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<String, Error> {
        let url = self.service_url(svc, path)?;
        debug!("GET {url} params={params:?}");

        let mut builder = self.authorize(self.http.get(url));
        if !params.is_empty() {
            builder = builder.query(params);
        }
        let resp = builder.send().await?;
        self.handle_text(resp).await
    }

    /// Send a POST with a JSON body and decode the JSON response.
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        svc: Service,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.service_url(svc, path)?;
        debug!("POST {url}");

        let resp = self.authorize(self.http.post(url)).json(body).send().await?;
        let text = self.handle_text(resp).await?;
        decode(text)
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_text(&self, resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            trace!(bytes = body.len(), "response body received");
            return Ok(body);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "token rejected or expired (HTTP 401)".into(),
            });
        }

        let raw = resp.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(err) if err.code.is_some() || err.description.is_some() => Error::Api {
                status: status.as_u16(),
                code: err.code,
                message: err.description.unwrap_or_else(|| status.to_string()),
            },
            _ => Error::Api {
                status: status.as_u16(),
                code: None,
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw.chars().take(200).collect()
                },
            },
        })
    }
}

/// Decode a JSON body, keeping a preview of it in the error.
fn decode<T: DeserializeOwned>(body: String) -> Result<T, Error> {
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

// ── Pagination helper ────────────────────────────────────────────────

/// Collect `total` items page by page.
///
/// The offset advances by the number of items each page actually returned,
/// so partial pages are tolerated. Any page error aborts the whole fetch;
/// an empty page before `total` is reached is reported as
/// [`Error::ShortPage`]. Sleeps `delay` between pages.
pub async fn paginate_all<T, F, Fut>(
    total: u64,
    page_size: u32,
    delay: Duration,
    fetch: F,
) -> Result<Vec<T>, Error>
where
    F: Fn(u64, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, Error>>,
{
    let mut all = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
    let mut offset: u64 = 0;
    let mut remaining = total;

    while remaining > 0 {
        let started = Instant::now();
        let page = fetch(offset, page_size).await?;
        let received = u64::try_from(page.len()).unwrap_or(u64::MAX);
        debug!(
            offset,
            received,
            took_ms = started.elapsed().as_millis(),
            "page fetched"
        );

        if received == 0 {
            return Err(Error::ShortPage { offset, remaining });
        }

        all.extend(page);
        offset += received;
        remaining = remaining.saturating_sub(received);

        if remaining > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    Ok(all)
}
