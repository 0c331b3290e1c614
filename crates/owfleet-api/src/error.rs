use thiserror::Error;

/// Top-level error type for the `owfleet-api` crate.
///
/// Covers every failure mode of the raw cloud SDK surface:
/// authentication, transport, HTTP status, and payload decoding.
/// `owfleet-core` maps these into run-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected, or a request came back 401.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Login succeeded but the response carried no `access_token`.
    #[error("Login response did not include an access token")]
    MissingToken,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The deployment topology has no entry for the requested service.
    #[error("Service '{0}' is not configured for this deployment")]
    UnknownService(&'static str),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success HTTP status, with the SDK's `ErrorCode`/`ErrorDescription`
    /// when the body carried them.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// A successful response lacked the collection or field we asked for.
    #[error("Response is missing '{field}'")]
    MissingField { field: &'static str },

    /// A page came back empty before the reported collection count was reached.
    #[error("Short page at offset {offset}: {remaining} items still expected")]
    ShortPage { offset: u64, remaining: u64 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the bearer token is no longer accepted.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
