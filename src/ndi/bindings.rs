//! Runtime-loaded NDI library
//!
//! Locates the platform's NDI runtime library, loads it once per process
//! and resolves the routing/finder entry points into a typed table.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_void, CStr, CString};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use libloading::Library;
use thiserror::Error;

use super::{NdiSdk, RawHandle, RawSource};

/// Environment variables naming an NDI runtime directory, in priority order
pub const RUNTIME_DIR_VARS: [&str; 3] = [
    "NDI_RUNTIME_DIR_V6",
    "NDI_RUNTIME_DIR_V5",
    "NDI_RUNTIME_DIR",
];

/// Errors raised while locating or loading the native library
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(&'static str),

    #[error("NDI runtime library not found (searched: {}). Install NDI Runtime 6.x and set NDI_RUNTIME_DIR_V6", format_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error("failed to load {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("symbol {symbol} missing from {path}: {source}")]
    Symbol {
        symbol: &'static str,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Platforms the NDI runtime ships for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
    MacOs,
}

impl Platform {
    /// Platform of the running process
    pub fn current() -> Result<Self, LoadError> {
        match std::env::consts::OS {
            "linux" => Ok(Platform::Linux),
            "windows" => Ok(Platform::Windows),
            "macos" => Ok(Platform::MacOs),
            other => Err(LoadError::UnsupportedPlatform(other)),
        }
    }
}

/// Runtime directory taken from the environment, if any variable is set
pub fn runtime_dir_from_env() -> Option<PathBuf> {
    RUNTIME_DIR_VARS
        .iter()
        .find_map(|var| std::env::var_os(var))
        .map(PathBuf::from)
}

/// Candidate library paths for `platform`, override directory first
pub fn library_candidates(platform: Platform, runtime_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    match platform {
        Platform::Linux => {
            if let Some(dir) = runtime_dir {
                paths.push(dir.join("lib").join("x86_64-linux-gnu").join("libndi.so"));
                paths.push(dir.join("lib").join("libndi.so"));
                paths.push(dir.join("libndi.so"));
            }
            paths.push(PathBuf::from("/usr/lib/libndi.so"));
            paths.push(PathBuf::from("/usr/lib/x86_64-linux-gnu/libndi.so"));
            paths.push(PathBuf::from("/usr/local/lib/libndi.so"));
        }
        Platform::Windows => {
            if let Some(dir) = runtime_dir {
                paths.push(dir.join("Processing.NDI.Lib.x64.dll"));
            }
            paths.push(PathBuf::from(
                "C:\\Program Files\\NDI\\NDI 6 Runtime\\Processing.NDI.Lib.x64.dll",
            ));
        }
        Platform::MacOs => {
            if let Some(dir) = runtime_dir {
                paths.push(dir.join("libndi.dylib"));
            }
            paths.push(PathBuf::from("/usr/local/lib/libndi.dylib"));
            paths.push(PathBuf::from(
                "/Library/NDI SDK for Apple/lib/macOS/libndi.dylib",
            ));
        }
    }

    paths
}

/// Find the first existing candidate for the running platform
pub fn locate_library() -> Result<PathBuf, LoadError> {
    let platform = Platform::current()?;
    let candidates = library_candidates(platform, runtime_dir_from_env().as_deref());

    candidates
        .iter()
        .find(|p| p.exists())
        .cloned()
        .ok_or(LoadError::NotFound {
            searched: candidates,
        })
}

static LIBRARY: OnceLock<Arc<NdiLibrary>> = OnceLock::new();

/// Load the NDI library, or return the already-loaded one
pub fn load_library() -> Result<Arc<NdiLibrary>, LoadError> {
    if let Some(lib) = LIBRARY.get() {
        return Ok(Arc::clone(lib));
    }

    let path = locate_library()?;
    let lib = NdiLibrary::open(&path)?;
    tracing::info!(path = %path.display(), "NDI library loaded");

    // A concurrent loader may have won; its table is used and ours dropped.
    Ok(Arc::clone(LIBRARY.get_or_init(|| Arc::new(lib))))
}

// --- Native layouts ---

#[repr(C)]
pub struct NDIlib_source_t {
    pub p_ndi_name: *const c_char,
    pub p_url_address: *const c_char,
}

#[repr(C)]
pub struct NDIlib_routing_create_t {
    pub p_ndi_name: *const c_char,
    pub p_groups: *const c_char,
}

#[repr(C)]
pub struct NDIlib_find_create_t {
    pub show_local_sources: bool,
    pub p_groups: *const c_char,
    pub p_extra_ips: *const c_char,
}

type InitializeFn = unsafe extern "C" fn() -> bool;
type DestroyFn = unsafe extern "C" fn();
type RoutingCreateFn = unsafe extern "C" fn(*const NDIlib_routing_create_t) -> *mut c_void;
type RoutingDestroyFn = unsafe extern "C" fn(*mut c_void);
type RoutingChangeFn = unsafe extern "C" fn(*mut c_void, *const NDIlib_source_t) -> bool;
type RoutingClearFn = unsafe extern "C" fn(*mut c_void) -> bool;
type RoutingConnectionsFn = unsafe extern "C" fn(*mut c_void, u32) -> i32;
type FindCreateFn = unsafe extern "C" fn(*const NDIlib_find_create_t) -> *mut c_void;
type FindDestroyFn = unsafe extern "C" fn(*mut c_void);
type FindWaitFn = unsafe extern "C" fn(*mut c_void, u32) -> bool;
type FindCurrentSourcesFn =
    unsafe extern "C" fn(*mut c_void, *mut u32) -> *const NDIlib_source_t;

/// Resolved NDI function table
///
/// The function pointers stay valid for as long as `_library` is alive,
/// which is the lifetime of this struct.
pub struct NdiLibrary {
    path: PathBuf,
    initialize: InitializeFn,
    destroy: DestroyFn,
    routing_create: RoutingCreateFn,
    routing_destroy: RoutingDestroyFn,
    routing_change: RoutingChangeFn,
    routing_clear: RoutingClearFn,
    routing_get_no_connections: RoutingConnectionsFn,
    find_create_v2: FindCreateFn,
    find_destroy: FindDestroyFn,
    find_wait_for_sources: FindWaitFn,
    find_get_current_sources: FindCurrentSourcesFn,
    _library: Library,
}

impl std::fmt::Debug for NdiLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdiLibrary").field("path", &self.path).finish()
    }
}

impl NdiLibrary {
    /// Load the library at `path` and resolve every entry point
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        // SAFETY: loading the NDI runtime runs its initialisers, which have
        // no preconditions beyond being loaded once per path.
        let library = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        macro_rules! resolve {
            ($name:literal, $ty:ty) => {{
                // SAFETY: the declared type matches the NDI SDK header.
                let symbol = unsafe { library.get::<$ty>(concat!($name, "\0").as_bytes()) }
                    .map_err(|source| LoadError::Symbol {
                        symbol: $name,
                        path: path.to_path_buf(),
                        source,
                    })?;
                *symbol
            }};
        }

        let initialize = resolve!("NDIlib_initialize", InitializeFn);
        let destroy = resolve!("NDIlib_destroy", DestroyFn);
        let routing_create = resolve!("NDIlib_routing_create", RoutingCreateFn);
        let routing_destroy = resolve!("NDIlib_routing_destroy", RoutingDestroyFn);
        let routing_change = resolve!("NDIlib_routing_change", RoutingChangeFn);
        let routing_clear = resolve!("NDIlib_routing_clear", RoutingClearFn);
        let routing_get_no_connections =
            resolve!("NDIlib_routing_get_no_connections", RoutingConnectionsFn);
        let find_create_v2 = resolve!("NDIlib_find_create_v2", FindCreateFn);
        let find_destroy = resolve!("NDIlib_find_destroy", FindDestroyFn);
        let find_wait_for_sources = resolve!("NDIlib_find_wait_for_sources", FindWaitFn);
        let find_get_current_sources =
            resolve!("NDIlib_find_get_current_sources", FindCurrentSourcesFn);

        Ok(Self {
            path: path.to_path_buf(),
            initialize,
            destroy,
            routing_create,
            routing_destroy,
            routing_change,
            routing_clear,
            routing_get_no_connections,
            find_create_v2,
            find_destroy,
            find_wait_for_sources,
            find_get_current_sources,
            _library: library,
        })
    }

    /// Path the library was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NdiSdk for NdiLibrary {
    fn initialize(&self) -> bool {
        unsafe { (self.initialize)() }
    }

    fn destroy(&self) {
        unsafe { (self.destroy)() }
    }

    fn routing_create(&self, ndi_name: &str, groups: &str) -> Option<RawHandle> {
        let (Ok(name), Ok(groups)) = (CString::new(ndi_name), CString::new(groups)) else {
            tracing::warn!(name = ndi_name, "Routing name or group contains NUL");
            return None;
        };

        let settings = NDIlib_routing_create_t {
            p_ndi_name: name.as_ptr(),
            p_groups: groups.as_ptr(),
        };

        RawHandle::from_ptr(unsafe { (self.routing_create)(&settings) })
    }

    unsafe fn routing_destroy(&self, handle: RawHandle) {
        (self.routing_destroy)(handle.as_ptr())
    }

    unsafe fn routing_change(&self, handle: RawHandle, source: &RawSource) -> bool {
        let (Ok(name), Ok(url)) = (
            CString::new(source.name.as_str()),
            CString::new(source.url_address.as_str()),
        ) else {
            tracing::warn!(source = %source.name, "Source name or address contains NUL");
            return false;
        };

        let native = NDIlib_source_t {
            p_ndi_name: name.as_ptr(),
            p_url_address: url.as_ptr(),
        };

        (self.routing_change)(handle.as_ptr(), &native)
    }

    unsafe fn routing_clear(&self, handle: RawHandle) -> bool {
        (self.routing_clear)(handle.as_ptr())
    }

    unsafe fn routing_connections(&self, handle: RawHandle, timeout_ms: u32) -> i32 {
        (self.routing_get_no_connections)(handle.as_ptr(), timeout_ms)
    }

    fn find_create(&self) -> Option<RawHandle> {
        // NULL settings: groups and discovery come from the system NDI config.
        RawHandle::from_ptr(unsafe { (self.find_create_v2)(std::ptr::null()) })
    }

    unsafe fn find_destroy(&self, handle: RawHandle) {
        (self.find_destroy)(handle.as_ptr())
    }

    unsafe fn find_wait_for_sources(&self, handle: RawHandle, timeout_ms: u32) -> bool {
        (self.find_wait_for_sources)(handle.as_ptr(), timeout_ms)
    }

    unsafe fn find_current_sources(&self, handle: RawHandle) -> Vec<RawSource> {
        let mut count: u32 = 0;
        let sources = (self.find_get_current_sources)(handle.as_ptr(), &mut count);
        decode_sources(sources, count)
    }
}

/// Decode `count` entries of a native source array
///
/// # Safety
/// `sources` must be null or point to at least `count` valid entries whose
/// string fields are null or NUL-terminated.
pub unsafe fn decode_sources(sources: *const NDIlib_source_t, count: u32) -> Vec<RawSource> {
    if sources.is_null() || count == 0 {
        return Vec::new();
    }

    std::slice::from_raw_parts(sources, count as usize)
        .iter()
        .map(|raw| RawSource {
            name: c_str_lossy(raw.p_ndi_name),
            url_address: c_str_lossy(raw.p_url_address),
        })
        .collect()
}

unsafe fn c_str_lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}
