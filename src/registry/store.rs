//! Channel registry implementation
//!
//! The central registry that owns every routing channel and its native
//! output handle.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::ndi::{NdiSdk, RoutingOutput};

use super::entry::{ChannelEntry, ChannelSnapshot, ChannelStatus, Transition};
use super::error::RegistryError;
use super::source::DiscoveredSource;

/// Channel id → current source name, in channel order
pub type Assignments = IndexMap<String, Option<String>>;

/// Registry of all routing channels
///
/// One lock guards the whole map, so every operation (including its native
/// call) runs to completion before the next one starts.
pub struct ChannelRegistry {
    /// Map of channel id to entry, in creation order
    channels: RwLock<IndexMap<String, ChannelEntry>>,

    /// SDK used to create outputs
    sdk: Arc<dyn NdiSdk>,

    /// Upper bound on the native wait when counting receivers
    receiver_wait: Duration,
}

impl ChannelRegistry {
    /// Create an empty registry that never waits on receiver queries
    pub fn new(sdk: Arc<dyn NdiSdk>) -> Self {
        Self::with_receiver_wait(sdk, Duration::ZERO)
    }

    /// Create an empty registry with a custom receiver-count wait
    pub fn with_receiver_wait(sdk: Arc<dyn NdiSdk>, receiver_wait: Duration) -> Self {
        Self {
            channels: RwLock::new(IndexMap::new()),
            sdk,
            receiver_wait,
        }
    }

    /// Create a channel and its native routing output
    ///
    /// The channel starts `Idle`.
    pub async fn create(
        &self,
        id: &str,
        ndi_name: &str,
        group: &str,
        label: &str,
        color: &str,
    ) -> Result<(), RegistryError> {
        let mut channels = self.channels.write().await;

        if channels.contains_key(id) {
            return Err(RegistryError::DuplicateChannel(id.to_string()));
        }

        let output = RoutingOutput::create(Arc::clone(&self.sdk), ndi_name, group)
            .ok_or_else(|| RegistryError::CreateFailed(ndi_name.to_string()))?;

        channels.insert(
            id.to_string(),
            ChannelEntry::new(id, label, color, group, output),
        );

        tracing::info!(channel = id, name = ndi_name, group = group, "Channel created");
        Ok(())
    }

    /// Point a channel at `source`
    ///
    /// On SDK failure the channel moves to `Error` and keeps whatever source
    /// it had before.
    pub async fn route(
        &self,
        id: &str,
        source: &DiscoveredSource,
    ) -> Result<Transition, RegistryError> {
        let mut channels = self.channels.write().await;

        let entry = channels
            .get_mut(id)
            .ok_or_else(|| RegistryError::ChannelNotFound(id.to_string()))?;

        let previous_source = entry.current_source_name();

        if !entry.output.change(&source.to_raw()) {
            entry.status = ChannelStatus::Error;
            tracing::error!(channel = id, source = %source.name, "Route failed");
            return Err(RegistryError::RouteFailed {
                channel: id.to_string(),
                source_name: source.name.clone(),
            });
        }

        entry.current_source = Some(source.clone());
        entry.status = ChannelStatus::Routed;

        tracing::info!(
            channel = id,
            source = %source.name,
            previous = ?previous_source,
            "Channel routed"
        );

        Ok(Transition {
            previous_source,
            channel: entry.snapshot(),
        })
    }

    /// Stop routing a channel
    ///
    /// On SDK failure nothing changes.
    pub async fn clear(&self, id: &str) -> Result<Transition, RegistryError> {
        let mut channels = self.channels.write().await;

        let entry = channels
            .get_mut(id)
            .ok_or_else(|| RegistryError::ChannelNotFound(id.to_string()))?;

        if !entry.output.clear() {
            tracing::error!(channel = id, "Clear failed");
            return Err(RegistryError::ClearFailed(id.to_string()));
        }

        let previous_source = entry.current_source_name();
        entry.current_source = None;
        entry.status = ChannelStatus::Idle;

        tracing::info!(channel = id, previous = ?previous_source, "Channel cleared");

        Ok(Transition {
            previous_source,
            channel: entry.snapshot(),
        })
    }

    /// Refresh and return the receiver count of a channel
    ///
    /// Unknown channels report 0.
    pub async fn receiver_count(&self, id: &str) -> u32 {
        let mut channels = self.channels.write().await;

        match channels.get_mut(id) {
            Some(entry) => {
                let count = entry.output.connections(self.receiver_wait);
                entry.connected_receivers = count;
                count
            }
            None => 0,
        }
    }

    /// Get a channel snapshot
    pub async fn channel(&self, id: &str) -> Option<ChannelSnapshot> {
        self.channels.read().await.get(id).map(ChannelEntry::snapshot)
    }

    /// All channels, in creation order
    pub async fn channels(&self) -> Vec<ChannelSnapshot> {
        self.channels
            .read()
            .await
            .values()
            .map(ChannelEntry::snapshot)
            .collect()
    }

    /// All channel ids, in creation order
    pub async fn channel_ids(&self) -> Vec<String> {
        self.channels.read().await.keys().cloned().collect()
    }

    /// Check if a channel exists
    pub async fn contains(&self, id: &str) -> bool {
        self.channels.read().await.contains_key(id)
    }

    /// Current channel → source assignments
    pub async fn assignments(&self) -> Assignments {
        self.channels
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), entry.current_source_name()))
            .collect()
    }

    /// Get total number of channels
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Destroy every channel's native output and empty the registry
    pub async fn destroy_all(&self) {
        let mut channels = self.channels.write().await;

        for (id, entry) in channels.drain(..) {
            tracing::info!(channel = %id, name = entry.ndi_name(), "Channel destroyed");
            // Dropping the entry releases the routing handle.
            drop(entry);
        }
    }
}
