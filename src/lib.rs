//! Portal Client
//!
//! An authenticated client for the cloud-networking portal API. Every resource
//! kind goes through one request lifecycle:
//!
//! 1. **Authentication** (`sdk::credentials`, `sdk::session`) - header or session mode
//! 2. **Tenant context** (`sdk::tenant`) - tenant-network id resolved once per client
//! 3. **Retrying transport** (`sdk::transport`) - bounded retries on transient failures
//! 4. **CRUD primitives** (`sdk::api_client`) - status contract per verb
//! 5. **Provisioning** (`sdk::provision`) - blocks until the server-side job is terminal
//! 6. **Resource API** (`sdk::resource`) - typed create/read/update/delete per kind
//!
//! Mutating calls report two independent outcomes: whether the HTTP write was
//! accepted, and (when requested) whether provisioning confirmed it.

pub mod config;
pub mod error;
pub mod metrics;
pub mod resources;
pub mod sdk;

pub use config::ClientConfig;
pub use error::{Error, ErrorKind, Result};
pub use sdk::{ApiClient, Resource, ResourceApi};

/// Client version reported in the user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
