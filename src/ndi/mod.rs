//! Native NDI SDK access
//!
//! This module is the only place that talks to the NDI runtime library.
//!
//! # Layers
//!
//! ```text
//!   NdiRuntime ──────────── process-wide init/destroy (state enum)
//!        │
//!        ▼
//!   Arc<dyn NdiSdk> ─────── typed call surface (NdiLibrary in production)
//!        │
//!        ├──► SourceFinder    owns the discovery handle
//!        └──► RoutingOutput   owns one routing handle per channel
//! ```
//!
//! Handles are plain [`RawHandle`] values at the trait boundary. Only the
//! owning wrappers (`SourceFinder`, `RoutingOutput`) hold them, and each
//! wrapper releases its handle exactly once.

pub mod bindings;
pub mod finder;
pub mod output;
pub mod runtime;

#[cfg(test)]
pub(crate) mod fake;

use std::ffi::c_void;
use std::ptr::NonNull;

pub use bindings::{library_candidates, load_library, locate_library, LoadError, NdiLibrary, Platform};
pub use finder::SourceFinder;
pub use output::RoutingOutput;
pub use runtime::{NdiRuntime, RuntimeState};

/// Opaque instance pointer returned by the SDK
///
/// Never null. Carries no ownership on its own; see [`RoutingOutput`] and
/// [`SourceFinder`] for the owning types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonNull<c_void>);

// The SDK hands these out from its own allocator; all access goes through
// the registry/finder locks.
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

impl RawHandle {
    /// Wrap a pointer returned by the SDK, `None` if it is null
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Pointer to pass back to the SDK
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// A source as reported by the SDK, before timestamping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSource {
    /// NDI name, unique on the network (e.g. `"HOST (Camera 1)"`)
    pub name: String,
    /// Address the receivers should connect to
    pub url_address: String,
}

impl RawSource {
    pub fn new(name: impl Into<String>, url_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_address: url_address.into(),
        }
    }
}

/// Typed call surface of the NDI runtime
///
/// A thin pass-through: no argument validation, no state. Methods taking a
/// [`RawHandle`] are `unsafe` because the handle must be live.
pub trait NdiSdk: Send + Sync {
    /// `NDIlib_initialize`. False means the runtime is unusable on this machine.
    fn initialize(&self) -> bool;

    /// `NDIlib_destroy`
    fn destroy(&self);

    /// `NDIlib_routing_create`. `None` if the SDK returned null.
    fn routing_create(&self, ndi_name: &str, groups: &str) -> Option<RawHandle>;

    /// `NDIlib_routing_destroy`
    ///
    /// # Safety
    /// `handle` must come from `routing_create` and must not be used again.
    unsafe fn routing_destroy(&self, handle: RawHandle);

    /// `NDIlib_routing_change`
    ///
    /// # Safety
    /// `handle` must be a live routing instance.
    unsafe fn routing_change(&self, handle: RawHandle, source: &RawSource) -> bool;

    /// `NDIlib_routing_clear`
    ///
    /// # Safety
    /// `handle` must be a live routing instance.
    unsafe fn routing_clear(&self, handle: RawHandle) -> bool;

    /// `NDIlib_routing_get_no_connections`, waiting at most `timeout_ms`
    ///
    /// # Safety
    /// `handle` must be a live routing instance.
    unsafe fn routing_connections(&self, handle: RawHandle, timeout_ms: u32) -> i32;

    /// `NDIlib_find_create_v2` with default (system) settings
    fn find_create(&self) -> Option<RawHandle>;

    /// `NDIlib_find_destroy`
    ///
    /// # Safety
    /// `handle` must come from `find_create` and must not be used again.
    unsafe fn find_destroy(&self, handle: RawHandle);

    /// `NDIlib_find_wait_for_sources`
    ///
    /// # Safety
    /// `handle` must be a live finder instance.
    unsafe fn find_wait_for_sources(&self, handle: RawHandle, timeout_ms: u32) -> bool;

    /// `NDIlib_find_get_current_sources`, decoded
    ///
    /// # Safety
    /// `handle` must be a live finder instance.
    unsafe fn find_current_sources(&self, handle: RawHandle) -> Vec<RawSource>;
}
