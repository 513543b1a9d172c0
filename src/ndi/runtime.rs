//! NDI runtime lifecycle
//!
//! `NDIlib_initialize` must run before any finder or routing instance is
//! created, and `NDIlib_destroy` only after all of them are gone.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::error::{Error, Result};

use super::bindings::{load_library, LoadError};
use super::NdiSdk;

/// Lifecycle state of the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Uninitialized,
    Initialized,
}

/// Guards the process-wide init/destroy pair
pub struct NdiRuntime {
    sdk: Arc<dyn NdiSdk>,
    state: Mutex<RuntimeState>,
}

static SHARED: OnceLock<Arc<NdiRuntime>> = OnceLock::new();

impl NdiRuntime {
    /// Create a runtime guard over an SDK implementation
    pub fn new(sdk: Arc<dyn NdiSdk>) -> Self {
        Self {
            sdk,
            state: Mutex::new(RuntimeState::Uninitialized),
        }
    }

    /// The process-wide runtime over the loaded NDI library
    ///
    /// Loads the library on first call.
    pub fn shared() -> std::result::Result<Arc<NdiRuntime>, LoadError> {
        if let Some(runtime) = SHARED.get() {
            return Ok(Arc::clone(runtime));
        }

        let library = load_library()?;
        Ok(Arc::clone(
            SHARED.get_or_init(|| Arc::new(NdiRuntime::new(library))),
        ))
    }

    /// SDK call surface shared with finder and outputs
    pub fn sdk(&self) -> Arc<dyn NdiSdk> {
        Arc::clone(&self.sdk)
    }

    /// Current lifecycle state
    pub fn state(&self) -> RuntimeState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == RuntimeState::Initialized
    }

    /// Initialize the runtime; no-op if already initialized
    pub fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == RuntimeState::Initialized {
            return Ok(());
        }

        if !self.sdk.initialize() {
            return Err(Error::RuntimeInit);
        }

        *state = RuntimeState::Initialized;
        tracing::info!("NDI runtime initialized");
        Ok(())
    }

    /// Tear the runtime down; no-op if not initialized
    pub fn destroy(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == RuntimeState::Uninitialized {
            return;
        }

        self.sdk.destroy();
        *state = RuntimeState::Uninitialized;
        tracing::info!("NDI runtime destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndi::fake::FakeSdk;

    #[test]
    fn test_initialize_is_idempotent() {
        let sdk = FakeSdk::new();
        let runtime = NdiRuntime::new(sdk.clone());
        assert_eq!(runtime.state(), RuntimeState::Uninitialized);

        runtime.initialize().unwrap();
        runtime.initialize().unwrap();

        assert!(runtime.is_initialized());
        assert_eq!(sdk.count_calls("initialize"), 1);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let sdk = FakeSdk::new();
        let runtime = NdiRuntime::new(sdk.clone());

        // Not initialized: nothing to do
        runtime.destroy();
        assert_eq!(sdk.count_calls("destroy"), 0);

        runtime.initialize().unwrap();
        runtime.destroy();
        runtime.destroy();

        assert_eq!(runtime.state(), RuntimeState::Uninitialized);
        assert_eq!(sdk.count_calls("destroy"), 1);
    }

    #[test]
    fn test_initialize_failure() {
        let sdk = FakeSdk::new();
        sdk.fail_init(true);
        let runtime = NdiRuntime::new(sdk.clone());

        assert!(matches!(runtime.initialize(), Err(Error::RuntimeInit)));
        assert!(!runtime.is_initialized());
    }
}
