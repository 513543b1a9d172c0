//! In-memory SDK used by the unit tests

use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::sync::{Arc, Mutex};

use super::{NdiSdk, RawHandle, RawSource};

#[derive(Default)]
struct FakeState {
    next_handle: usize,
    calls: Vec<&'static str>,
    outputs: HashMap<RawHandle, String>,
    routed: HashMap<String, Option<String>>,
    connections: HashMap<String, i32>,
    finders: HashSet<RawHandle>,
    destroyed: HashSet<RawHandle>,
    double_destroys: usize,
    sources: Vec<RawSource>,
    last_wait_timeout: Option<u32>,
    fail_init: bool,
    fail_create: bool,
    fail_find_create: bool,
    fail_change: bool,
    fail_clear: bool,
}

impl FakeState {
    fn allocate(&mut self) -> RawHandle {
        self.next_handle += 1;
        // Addresses are never dereferenced; 8-byte steps keep them distinct.
        RawHandle::from_ptr((self.next_handle * 8) as *mut c_void)
            .unwrap_or_else(|| unreachable!("non-zero address"))
    }

    fn release(&mut self, handle: RawHandle) {
        if !self.destroyed.insert(handle) {
            self.double_destroys += 1;
        }
    }
}

/// Records calls and plays back configured results
#[derive(Default)]
pub(crate) struct FakeSdk {
    state: Mutex<FakeState>,
}

impl FakeSdk {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_sources(&self, sources: &[(&str, &str)]) {
        self.with(|s| {
            s.sources = sources
                .iter()
                .map(|(name, url)| RawSource::new(*name, *url))
                .collect()
        });
    }

    pub fn set_connections(&self, ndi_name: &str, count: i32) {
        self.with(|s| {
            s.connections.insert(ndi_name.to_string(), count);
        });
    }

    pub fn fail_init(&self, fail: bool) {
        self.with(|s| s.fail_init = fail);
    }

    pub fn fail_create(&self, fail: bool) {
        self.with(|s| s.fail_create = fail);
    }

    pub fn fail_find_create(&self, fail: bool) {
        self.with(|s| s.fail_find_create = fail);
    }

    pub fn fail_change(&self, fail: bool) {
        self.with(|s| s.fail_change = fail);
    }

    pub fn fail_clear(&self, fail: bool) {
        self.with(|s| s.fail_clear = fail);
    }

    /// Names of calls made, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.with(|s| s.calls.clone())
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.with(|s| s.calls.iter().filter(|c| **c == name).count())
    }

    pub fn live_outputs(&self) -> usize {
        self.with(|s| {
            s.outputs
                .keys()
                .filter(|h| !s.destroyed.contains(h))
                .count()
        })
    }

    pub fn double_destroys(&self) -> usize {
        self.with(|s| s.double_destroys)
    }

    pub fn last_wait_timeout(&self) -> Option<u32> {
        self.with(|s| s.last_wait_timeout)
    }

    /// Source the output advertised as `ndi_name` currently points at
    pub fn routed_to(&self, ndi_name: &str) -> Option<String> {
        self.with(|s| s.routed.get(ndi_name).cloned().flatten())
    }
}

impl NdiSdk for FakeSdk {
    fn initialize(&self) -> bool {
        self.with(|s| {
            s.calls.push("initialize");
            !s.fail_init
        })
    }

    fn destroy(&self) {
        self.with(|s| s.calls.push("destroy"));
    }

    fn routing_create(&self, ndi_name: &str, _groups: &str) -> Option<RawHandle> {
        self.with(|s| {
            s.calls.push("routing_create");
            if s.fail_create || s.outputs.values().any(|n| n == ndi_name) {
                return None;
            }
            let handle = s.allocate();
            s.outputs.insert(handle, ndi_name.to_string());
            Some(handle)
        })
    }

    unsafe fn routing_destroy(&self, handle: RawHandle) {
        self.with(|s| {
            s.calls.push("routing_destroy");
            s.release(handle);
            s.outputs.remove(&handle);
        });
    }

    unsafe fn routing_change(&self, handle: RawHandle, source: &RawSource) -> bool {
        self.with(|s| {
            s.calls.push("routing_change");
            if s.fail_change {
                return false;
            }
            if let Some(name) = s.outputs.get(&handle).cloned() {
                s.routed.insert(name, Some(source.name.clone()));
            }
            true
        })
    }

    unsafe fn routing_clear(&self, handle: RawHandle) -> bool {
        self.with(|s| {
            s.calls.push("routing_clear");
            if s.fail_clear {
                return false;
            }
            if let Some(name) = s.outputs.get(&handle).cloned() {
                s.routed.insert(name, None);
            }
            true
        })
    }

    unsafe fn routing_connections(&self, handle: RawHandle, _timeout_ms: u32) -> i32 {
        self.with(|s| {
            s.calls.push("routing_connections");
            s.outputs
                .get(&handle)
                .and_then(|name| s.connections.get(name))
                .copied()
                .unwrap_or(0)
        })
    }

    fn find_create(&self) -> Option<RawHandle> {
        self.with(|s| {
            s.calls.push("find_create");
            if s.fail_find_create {
                return None;
            }
            let handle = s.allocate();
            s.finders.insert(handle);
            Some(handle)
        })
    }

    unsafe fn find_destroy(&self, handle: RawHandle) {
        self.with(|s| {
            s.calls.push("find_destroy");
            s.release(handle);
            s.finders.remove(&handle);
        });
    }

    unsafe fn find_wait_for_sources(&self, _handle: RawHandle, timeout_ms: u32) -> bool {
        self.with(|s| {
            s.calls.push("find_wait_for_sources");
            s.last_wait_timeout = Some(timeout_ms);
            !s.sources.is_empty()
        })
    }

    unsafe fn find_current_sources(&self, _handle: RawHandle) -> Vec<RawSource> {
        self.with(|s| {
            s.calls.push("find_current_sources");
            s.sources.clone()
        })
    }
}
