// ── Core error types ──
//
// Run-level errors from owfleet-core. Consumers never see raw HTTP status
// codes or JSON parse failures; the `From<owfleet_api::Error>` impl folds
// transport-layer errors into these variants.

use std::path::PathBuf;

use thiserror::Error;

use crate::report::ReportError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    // ── Data errors ──────────────────────────────────────────────────
    /// A bulk listing failed part way; the collection is void, never partial.
    #[error("No {resource} data available: {reason}")]
    CollectionUnavailable {
        resource: &'static str,
        reason: String,
    },

    /// Every attempt to fetch a device's last state failed.
    #[error("Unable to load statistics for {mac} after {attempts} attempts")]
    StatsUnavailable { mac: String, attempts: u32 },

    #[error("Cache file {}: {message}", path.display())]
    Cache { path: PathBuf, message: String },

    #[error(transparent)]
    Report(#[from] ReportError),

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// The SDK's `ErrorCode`, when the body carried one.
        code: Option<i64>,
        status: Option<u16>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<owfleet_api::Error> for CoreError {
    fn from(err: owfleet_api::Error) -> Self {
        use owfleet_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::MissingToken => CoreError::AuthenticationFailed {
                message: "login response carried no access token".into(),
            },
            ApiError::Transport(ref e) => {
                let url = e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string);
                if e.is_timeout() {
                    CoreError::Timeout { url }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url,
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid service URL: {e}"),
            },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::UnknownService(svc) => CoreError::Config {
                message: format!("service '{svc}' missing from deployment topology"),
            },
            ApiError::Api {
                status,
                code,
                message,
            } => CoreError::Api {
                message,
                code,
                status: Some(status),
            },
            ApiError::MissingField { field } => CoreError::Api {
                message: format!("response is missing '{field}'"),
                code: None,
                status: None,
            },
            ApiError::ShortPage { offset, remaining } => CoreError::Api {
                message: format!("empty page at offset {offset} with {remaining} items outstanding"),
                code: None,
                status: None,
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_auth_error_maps_to_authentication_failed() {
        let err = CoreError::from(owfleet_api::Error::Authentication {
            message: "HTTP 401".into(),
        });
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }

    #[test]
    fn unknown_service_is_config_error() {
        let err = CoreError::from(owfleet_api::Error::UnknownService("owprov"));
        assert!(matches!(err, CoreError::Config { .. }));
        assert!(err.to_string().contains("owprov"));
    }
}
