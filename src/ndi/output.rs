//! Owned routing output handle

use std::sync::Arc;
use std::time::Duration;

use super::{NdiSdk, RawHandle, RawSource};

/// A routing source advertised on the network
///
/// Owns its native handle: the handle is created by [`RoutingOutput::create`]
/// and destroyed exactly once when the value is dropped.
pub struct RoutingOutput {
    sdk: Arc<dyn NdiSdk>,
    handle: RawHandle,
    ndi_name: String,
}

impl RoutingOutput {
    /// Advertise a new routing source named `ndi_name` in `group`
    ///
    /// Returns `None` if the SDK refused (name collision, resource
    /// exhaustion, or runtime not initialized).
    pub fn create(sdk: Arc<dyn NdiSdk>, ndi_name: &str, group: &str) -> Option<Self> {
        let handle = sdk.routing_create(ndi_name, group)?;

        Some(Self {
            sdk,
            handle,
            ndi_name: ndi_name.to_string(),
        })
    }

    /// Advertised NDI name
    pub fn ndi_name(&self) -> &str {
        &self.ndi_name
    }

    /// Point receivers of this output at `source`
    pub fn change(&self, source: &RawSource) -> bool {
        // SAFETY: `handle` is live until drop.
        unsafe { self.sdk.routing_change(self.handle, source) }
    }

    /// Stop directing receivers anywhere
    pub fn clear(&self) -> bool {
        // SAFETY: `handle` is live until drop.
        unsafe { self.sdk.routing_clear(self.handle) }
    }

    /// Number of receivers currently connected, waiting at most `wait`
    pub fn connections(&self, wait: Duration) -> u32 {
        let timeout_ms = u32::try_from(wait.as_millis()).unwrap_or(u32::MAX);

        // SAFETY: `handle` is live until drop.
        let count = unsafe { self.sdk.routing_connections(self.handle, timeout_ms) };
        u32::try_from(count).unwrap_or(0)
    }
}

impl Drop for RoutingOutput {
    fn drop(&mut self) {
        // SAFETY: the handle is owned by this value and never used after this.
        unsafe { self.sdk.routing_destroy(self.handle) };
        tracing::debug!(name = %self.ndi_name, "Routing output destroyed");
    }
}

impl std::fmt::Debug for RoutingOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingOutput")
            .field("ndi_name", &self.ndi_name)
            .field("handle", &self.handle)
            .finish()
    }
}
