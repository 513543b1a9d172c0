//! Registry error types
//!
//! Operational failures of channel operations. None of these are fatal; the
//! caller reports them and the service keeps running.

use thiserror::Error;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No channel with this id
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// A channel with this id already exists
    #[error("Channel already exists: {0}")]
    DuplicateChannel(String),

    /// The source is not in the latest discovery snapshot
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// The SDK returned a null routing handle
    #[error("NDIlib_routing_create() failed for \"{0}\"")]
    CreateFailed(String),

    /// The SDK rejected a route change; the channel is now in error state
    #[error("Failed to route channel {channel} to \"{source_name}\"")]
    RouteFailed { channel: String, source_name: String },

    /// The SDK rejected a clear; channel state is unchanged
    #[error("Failed to clear channel {0}")]
    ClearFailed(String),
}
