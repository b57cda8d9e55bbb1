//! Representative resource schemas.
//!
//! Each kind is a flat payload struct plus the collection it lives in. The
//! generic [`ResourceApi`] does all the work.

pub mod billing_tag;
pub mod connector_internet;
pub mod segment;

pub use billing_tag::BillingTag;
pub use connector_internet::ConnectorInternet;
pub use segment::{IpBlocks, Segment};

use crate::sdk::{ApiClient, ResourceApi};

impl ApiClient {
    /// Segments of the tenant network.
    pub fn segments(&self) -> ResourceApi<Segment> {
        self.resource(self.tenant_uri(segment::URI), true)
    }

    /// Billing tags; tenant-global and never provisioned.
    pub fn billing_tags(&self) -> ResourceApi<BillingTag> {
        self.resource(self.global_uri(billing_tag::URI), false)
    }

    /// Internet exit connectors of the tenant network.
    pub fn internet_connectors(&self) -> ResourceApi<ConnectorInternet> {
        self.resource(self.tenant_uri(connector_internet::URI), true)
    }
}
