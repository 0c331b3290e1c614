//! Telemetry pipeline between `owfleet-api` and the `owfleet` CLI.
//!
//! This crate owns the business logic of a collection run:
//!
//! - **[`Session`]**: authenticates a deployment, reusing the disk-cached
//!   bearer token per [`TokenPolicy`].
//!
//! - **Fetching** ([`fetch`], [`cache`]): count-then-page loading of the
//!   bulk listings. A listing is complete or void, never partial. The
//!   [`DataCache`] serves listings from disk while younger than its TTL.
//!
//! - **[`ProvData`]**: the inventory → venue → entity joins, indexed once
//!   at load.
//!
//! - **Per-device stages** ([`stats`], [`normalize`], [`clients`],
//!   [`anomaly`]): last-state fetch with retry, flat table rows, cross-AP
//!   client aggregation and health checks.
//!
//! - **[`pipeline::collect`]**: drives one run through a [`RunContext`] and
//!   returns a [`RunOutput`] whose tables the [`ReportWriter`] writes as
//!   JSON and CSV.

pub mod anomaly;
pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod provisioning;
pub mod report;
pub mod session;
pub mod stats;

// ── Primary re-exports ──────────────────────────────────────────────
pub use anomaly::Warnings;
pub use cache::{DataCache, TokenCache};
pub use clients::ClientTable;
pub use config::{
    CollectOptions, DeploymentConfig, FetchSettings, LoginCredentials, RetryPolicy,
    StatsFailurePolicy, Thresholds, TlsVerification, TokenPolicy,
};
pub use error::CoreError;
pub use pipeline::{RunContext, RunOutput, RunSummary, collect};
pub use provisioning::{DeviceInfo, ProvData, Target};
pub use report::{ReportError, ReportWriter, Table};
pub use session::Session;
pub use stats::PayloadDiagnostics;

pub use model::{
    AggregatedClient, ApClient, ApIdentity, Band, ClientSighting, DeviceRef, MacAddress,
    NeighborRecord, NormalizedDevice, SurveyRecord,
};
