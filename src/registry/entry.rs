//! Channel entry and state types
//!
//! This module defines the per-channel state stored in the registry.

use serde::{Deserialize, Serialize};

use crate::ndi::RoutingOutput;

use super::source::DiscoveredSource;

/// Routing state of a channel
///
/// `Routed` always has a current source and `Idle` never does. `Error` may
/// keep the source from before the failed change, or have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// Not pointed at anything
    Idle,
    /// Receivers are directed to `current_source`
    Routed,
    /// The last route change was rejected by the SDK
    Error,
}

/// Entry for a single channel in the registry
pub struct ChannelEntry {
    /// Operator-assigned id (e.g. "A")
    pub id: String,

    /// Display label
    pub label: String,

    /// Display color (e.g. "#2196F3")
    pub color: String,

    /// NDI group the output is advertised in
    pub group: String,

    /// Last source successfully routed to
    pub current_source: Option<DiscoveredSource>,

    /// Receivers connected at the last poll
    pub connected_receivers: u32,

    /// Current status
    pub status: ChannelStatus,

    /// Native routing output, owned for the lifetime of the entry
    pub(super) output: RoutingOutput,
}

impl ChannelEntry {
    pub(super) fn new(
        id: &str,
        label: &str,
        color: &str,
        group: &str,
        output: RoutingOutput,
    ) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            color: color.to_string(),
            group: group.to_string(),
            current_source: None,
            connected_receivers: 0,
            status: ChannelStatus::Idle,
            output,
        }
    }

    /// Advertised NDI name
    pub fn ndi_name(&self) -> &str {
        self.output.ndi_name()
    }

    /// Name of the current source, if any
    pub fn current_source_name(&self) -> Option<String> {
        self.current_source.as_ref().map(|s| s.name.clone())
    }

    /// Handle-free copy for callers and observers
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            id: self.id.clone(),
            label: self.label.clone(),
            color: self.color.clone(),
            ndi_name: self.ndi_name().to_string(),
            group: self.group.clone(),
            current_source: self.current_source.clone(),
            connected_receivers: self.connected_receivers,
            status: self.status,
        }
    }
}

/// Serializable view of a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnapshot {
    pub id: String,
    pub label: String,
    pub color: String,
    pub ndi_name: String,
    pub group: String,
    pub current_source: Option<DiscoveredSource>,
    pub connected_receivers: u32,
    pub status: ChannelStatus,
}

/// Result of a successful route or clear
#[derive(Debug, Clone)]
pub struct Transition {
    /// Source name before the change
    pub previous_source: Option<String>,
    /// Channel state after the change
    pub channel: ChannelSnapshot,
}
