use serde::{Deserialize, Serialize};

use crate::domain::GoodsLinks;

/// Response body of the remote analysis endpoint.
///
/// `results` defaults to empty so an error body or a shape drift never
/// breaks the flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub results: Vec<MatchResult>,
}

/// One ranked match returned by the analysis endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default, skip_serializing_if = "GoodsLinks::is_empty")]
    pub goods: GoodsLinks,
}
