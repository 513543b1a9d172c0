//! NDI source discovery

use std::sync::Arc;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::registry::DiscoveredSource;

use super::{NdiSdk, RawHandle};

/// Owns the single discovery session
///
/// The session is created explicitly with [`SourceFinder::create`] and
/// released by [`SourceFinder::destroy`] (or on drop).
pub struct SourceFinder {
    sdk: Arc<dyn NdiSdk>,
    handle: Option<RawHandle>,
}

impl SourceFinder {
    /// A finder with no session yet
    pub fn new(sdk: Arc<dyn NdiSdk>) -> Self {
        Self { sdk, handle: None }
    }

    /// Whether the discovery session exists
    pub fn is_created(&self) -> bool {
        self.handle.is_some()
    }

    /// Create the discovery session; no-op if it already exists
    pub fn create(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let handle = self.sdk.find_create().ok_or(Error::FinderCreate)?;
        self.handle = Some(handle);
        tracing::info!("NDI finder created");
        Ok(())
    }

    /// Current list of visible sources
    ///
    /// Never blocks: the SDK is asked to wait with a zero timeout. Returns an
    /// empty list if no session exists or nothing is visible.
    pub fn poll(&self) -> Vec<DiscoveredSource> {
        let Some(handle) = self.handle else {
            return Vec::new();
        };

        // SAFETY: the handle is live while stored in `self.handle`.
        let raw = unsafe {
            self.sdk.find_wait_for_sources(handle, 0);
            self.sdk.find_current_sources(handle)
        };

        let now = Utc::now();
        raw.into_iter()
            .map(|source| DiscoveredSource {
                name: source.name,
                url_address: source.url_address,
                last_seen: now,
            })
            .collect()
    }

    /// Release the discovery session; no-op if none exists
    pub fn destroy(&mut self) {
        if let Some(handle) = self.handle.take() {
            // SAFETY: taken out of `self.handle`, so never used again.
            unsafe { self.sdk.find_destroy(handle) };
            tracing::info!("NDI finder destroyed");
        }
    }
}

impl Drop for SourceFinder {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndi::fake::FakeSdk;

    #[test]
    fn test_poll_without_session_is_empty() {
        let sdk = FakeSdk::new();
        sdk.set_sources(&[("HOST (Cam 1)", "10.0.0.1:5961")]);
        let finder = SourceFinder::new(sdk.clone());

        assert!(finder.poll().is_empty());
        assert_eq!(sdk.count_calls("find_wait_for_sources"), 0);
    }

    #[test]
    fn test_poll_decodes_sources() {
        let sdk = FakeSdk::new();
        sdk.set_sources(&[
            ("HOST (Cam 1)", "10.0.0.1:5961"),
            ("HOST (Cam 2)", "10.0.0.2:5961"),
        ]);
        let mut finder = SourceFinder::new(sdk.clone());
        finder.create().unwrap();

        let sources = finder.poll();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "HOST (Cam 1)");
        assert_eq!(sources[1].url_address, "10.0.0.2:5961");
        assert_eq!(sources[0].last_seen, sources[1].last_seen);
        assert_eq!(sdk.last_wait_timeout(), Some(0));
    }

    #[test]
    fn test_poll_no_sources() {
        let sdk = FakeSdk::new();
        let mut finder = SourceFinder::new(sdk.clone());
        finder.create().unwrap();

        assert!(finder.poll().is_empty());
    }

    #[test]
    fn test_create_failure() {
        let sdk = FakeSdk::new();
        sdk.fail_find_create(true);
        let mut finder = SourceFinder::new(sdk.clone());

        assert!(matches!(finder.create(), Err(Error::FinderCreate)));
        assert!(!finder.is_created());
    }

    #[test]
    fn test_destroy_once() {
        let sdk = FakeSdk::new();
        let mut finder = SourceFinder::new(sdk.clone());
        finder.create().unwrap();
        finder.create().unwrap();
        assert_eq!(sdk.count_calls("find_create"), 1);

        finder.destroy();
        finder.destroy();
        drop(finder);

        assert_eq!(sdk.count_calls("find_destroy"), 1);
        assert_eq!(sdk.double_destroys(), 0);
    }
}
