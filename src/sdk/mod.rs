//! Portal SDK.
//!
//! # Architecture
//!
//! - `credentials` - Header/session authorization
//! - `session` - Session-mode login and cookie jar
//! - `retry` - Retry policy with exponential backoff
//! - `transport` - reqwest client wrapped in the retry policy
//! - `tenant` - Tenant-network discovery
//! - `api_client` - CRUD primitives
//! - `provision` - Provisioning and validation job poller
//! - `resource` - Generic typed resource API
//! - `types` - Wire and result types

pub mod api_client;
pub mod credentials;
pub mod provision;
pub mod resource;
pub mod retry;
pub mod session;
pub mod tenant;
pub mod transport;
pub mod types;

pub use api_client::ApiClient;
pub use credentials::{AuthMode, Authorization, Credentials};
pub use provision::{JobKind, PollSettings};
pub use resource::{Resource, ResourceApi};
pub use session::SessionStore;
pub use types::*;
