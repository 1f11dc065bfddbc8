use serde::Deserialize;

/// One upsert in an import batch, as received on the wire. Identifiers and
/// the kind tag stay raw strings here so that malformed values surface as
/// validation failures instead of body-decoding failures.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub price: Option<i64>,
}

/// A whole import batch: unordered items plus the single timestamp applied to
/// every node the batch touches.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub items: Vec<ImportItem>,
    pub update_date: String,
}
