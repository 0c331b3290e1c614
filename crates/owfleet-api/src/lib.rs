// owfleet-api: Async Rust client for the OpenWiFi cloud SDK services

pub mod auth;
pub mod client;
pub mod commands;
pub mod devices;
pub mod error;
pub mod models;
pub mod provisioning;
pub mod transport;

pub use client::{CloudClient, Service, ServiceEndpoint, paginate_all};
pub use commands::QueuedCommand;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
