//! Change notifications for observers
//!
//! Events are fanned out over a `tokio::sync::broadcast` channel. Publishing
//! with nobody subscribed is fine; slow subscribers see `Lagged` and skip
//! ahead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::registry::{ChannelSnapshot, DiscoveredSource, Transition};

/// Event pushed to observers
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"heartbeat","timestamp":"2026-10-17T09:30:00Z"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RouterEvent {
    /// Full channel list, sent to a newly connected observer
    ChannelsSync {
        timestamp: DateTime<Utc>,
        channels: Vec<ChannelSnapshot>,
    },

    ChannelRouted {
        timestamp: DateTime<Utc>,
        channel_id: String,
        previous_source: Option<String>,
        new_source: String,
        channel: ChannelSnapshot,
    },

    ChannelCleared {
        timestamp: DateTime<Utc>,
        channel_id: String,
        previous_source: Option<String>,
        channel: ChannelSnapshot,
    },

    SourcesUpdated {
        timestamp: DateTime<Utc>,
        sources: Vec<DiscoveredSource>,
    },

    ReceiverCountUpdated {
        timestamp: DateTime<Utc>,
        channel_id: String,
        connected_receivers: u32,
    },

    /// Liveness only
    Heartbeat { timestamp: DateTime<Utc> },
}

impl RouterEvent {
    pub fn channels_sync(channels: Vec<ChannelSnapshot>) -> Self {
        RouterEvent::ChannelsSync {
            timestamp: Utc::now(),
            channels,
        }
    }

    pub fn channel_routed(transition: &Transition) -> Self {
        let channel = transition.channel.clone();
        RouterEvent::ChannelRouted {
            timestamp: Utc::now(),
            channel_id: channel.id.clone(),
            previous_source: transition.previous_source.clone(),
            new_source: channel
                .current_source
                .as_ref()
                .map(|s| s.name.clone())
                .unwrap_or_default(),
            channel,
        }
    }

    pub fn channel_cleared(transition: &Transition) -> Self {
        let channel = transition.channel.clone();
        RouterEvent::ChannelCleared {
            timestamp: Utc::now(),
            channel_id: channel.id.clone(),
            previous_source: transition.previous_source.clone(),
            channel,
        }
    }

    pub fn sources_updated(sources: Vec<DiscoveredSource>) -> Self {
        RouterEvent::SourcesUpdated {
            timestamp: Utc::now(),
            sources,
        }
    }

    pub fn receiver_count_updated(channel_id: &str, connected_receivers: u32) -> Self {
        RouterEvent::ReceiverCountUpdated {
            timestamp: Utc::now(),
            channel_id: channel_id.to_string(),
            connected_receivers,
        }
    }

    pub fn heartbeat() -> Self {
        RouterEvent::Heartbeat {
            timestamp: Utc::now(),
        }
    }

    /// Wire name of the event type
    pub fn kind(&self) -> &'static str {
        match self {
            RouterEvent::ChannelsSync { .. } => "channels_sync",
            RouterEvent::ChannelRouted { .. } => "channel_routed",
            RouterEvent::ChannelCleared { .. } => "channel_cleared",
            RouterEvent::SourcesUpdated { .. } => "sources_updated",
            RouterEvent::ReceiverCountUpdated { .. } => "receiver_count_updated",
            RouterEvent::Heartbeat { .. } => "heartbeat",
        }
    }
}

/// Notification sink shared by the service and its tasks
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RouterEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.tx.subscribe()
    }

    /// Send an event to all subscribers
    ///
    /// Returns the number of receivers, or 0 if there are none.
    pub fn publish(&self, event: RouterEvent) -> usize {
        tracing::trace!(event = event.kind(), "Publishing event");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
