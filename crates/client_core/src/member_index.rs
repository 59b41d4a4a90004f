use std::collections::{HashMap, HashSet};

use reqwest::header::{HeaderValue, CACHE_CONTROL, PRAGMA};
use serde_json::Value;
use shared::domain::{MemberRecord, NameKey};
use tracing::{debug, warn};

/// Read-only lookup of member records by normalized display name.
///
/// Loaded once per screen mount and dropped on navigation away; a load
/// failure degrades to an empty index rather than surfacing to the caller.
#[derive(Debug, Default)]
pub struct MemberIndex {
    by_name: HashMap<NameKey, MemberRecord>,
}

impl MemberIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = MemberRecord>) -> Self {
        let mut by_name = HashMap::new();
        for record in records {
            let key = record.name_key();
            if key.is_empty() {
                continue;
            }
            // Last write wins; the source document guarantees no order.
            by_name.insert(key, record);
        }
        Self { by_name }
    }

    /// Fetch and index the static member resource.
    ///
    /// The document must reflect its latest content, so the request carries
    /// cache-bypassing headers. Failures are logged and yield an empty
    /// index; the calling screen degrades to "no fallback data available".
    pub async fn load(http: &reqwest::Client, url: &str) -> Self {
        match Self::try_load(http, url).await {
            Ok(index) => {
                debug!(url, members = index.len(), "member index loaded");
                index
            }
            Err(err) => {
                warn!(url, "member index load failed: {err:#}");
                Self::empty()
            }
        }
    }

    async fn try_load(http: &reqwest::Client, url: &str) -> anyhow::Result<Self> {
        let document: Value = http
            .get(url)
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .header(PRAGMA, HeaderValue::from_static("no-cache"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(Self::from_document(document))
    }

    /// Accepts both document shapes seen in the wild: an object whose values
    /// are records, or a plain array of records.
    fn from_document(document: Value) -> Self {
        let values: Vec<Value> = match document {
            Value::Object(map) => map.into_iter().map(|(_, value)| value).collect(),
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        let records = values
            .into_iter()
            .filter_map(|value| serde_json::from_value::<MemberRecord>(value).ok());
        Self::from_records(records)
    }

    pub fn get(&self, name: &str) -> Option<&MemberRecord> {
        self.by_name.get(&NameKey::new(name))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Every resolvable member image, de-duplicated (set semantics) before
    /// it feeds the probe step.
    pub fn candidate_images(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for record in self.by_name.values() {
            if let Some(url) = record.display_image() {
                if seen.insert(url.to_string()) {
                    candidates.push(url.to_string());
                }
            }
        }
        candidates
    }
}

#[cfg(test)]
#[path = "tests/member_index_tests.rs"]
mod tests;
