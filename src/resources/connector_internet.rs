use serde::{Deserialize, Serialize};

use crate::sdk::Resource;

pub(crate) const URI: &str = "v1/internet-connectors";

/// Internet exit attached to a cloud exchange point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorInternet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub cxp: String,
    pub size: String,
    #[serde(default)]
    pub group: Option<String>,
    pub segments: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub billing_tags: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nat_type: Option<String>,
}

impl Resource for ConnectorInternet {
    fn id(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
