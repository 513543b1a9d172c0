//! Discovered sources and the discovery snapshot cache

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::ndi::RawSource;

/// A network source seen by the last discovery poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredSource {
    /// SDK-assigned name, unique on the network
    pub name: String,
    /// Address receivers are directed to
    pub url_address: String,
    /// When the poll that produced this entry ran
    pub last_seen: DateTime<Utc>,
}

impl DiscoveredSource {
    pub fn new(name: impl Into<String>, url_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_address: url_address.into(),
            last_seen: Utc::now(),
        }
    }

    /// Native form passed to the routing change call
    pub fn to_raw(&self) -> RawSource {
        RawSource::new(self.name.as_str(), self.url_address.as_str())
    }
}

/// Latest discovery snapshot, keyed by source name
///
/// Replaced wholesale on every poll. A source missing from the newest poll
/// is gone immediately.
#[derive(Debug, Default)]
pub struct SourceCache {
    sources: RwLock<IndexMap<String, DiscoveredSource>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new snapshot and return it
    pub async fn replace(&self, discovered: Vec<DiscoveredSource>) -> Vec<DiscoveredSource> {
        let mut sources = self.sources.write().await;
        sources.clear();
        for source in discovered {
            sources.insert(source.name.clone(), source);
        }
        sources.values().cloned().collect()
    }

    /// Exact-match lookup by name
    pub async fn get(&self, name: &str) -> Option<DiscoveredSource> {
        self.sources.read().await.get(name).cloned()
    }

    /// All sources, in discovery order
    pub async fn all(&self) -> Vec<DiscoveredSource> {
        self.sources.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.sources.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sources.read().await.is_empty()
    }
}
