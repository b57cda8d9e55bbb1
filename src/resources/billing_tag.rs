use serde::{Deserialize, Serialize};

use crate::sdk::Resource;

pub(crate) const URI: &str = "tags";

/// Tenant-global tag used to attribute cost.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Resource for BillingTag {
    fn id(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
