use serde::{Deserialize, Serialize};

use crate::sdk::Resource;

pub(crate) const URI: &str = "segments";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpBlocks {
    pub values: Vec<String>,
}

/// A named routing domain connectors and services attach to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub asn: u32,
    pub ip_blocks: IpBlocks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "reservePublicIPsForUserAndSiteConnectivity")]
    pub reserve_public_ips_for_user_and_site_connectivity: bool,
}

impl Resource for Segment {
    fn id(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
