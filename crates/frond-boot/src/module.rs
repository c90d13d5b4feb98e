//! Wasm module handle with guarded one-time initialization.
//!
//! Modules of this kind require explicit memory/runtime setup before any
//! exported function is safe to call. Rather than trusting caller
//! discipline, [`InitGuard`] tracks the lifecycle explicitly and refuses
//! out-of-order calls.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the bootstrap chain.
#[derive(Error, Debug)]
pub enum BootError {
    /// The dynamic import of the module failed (network failure, malformed
    /// binary).
    #[error("module load failed: {0}")]
    ModuleLoad(String),

    /// The module's initialization entry point failed.
    #[error("module initialization failed: {0}")]
    ModuleInit(String),

    /// The module's `start` export threw.
    #[error("start failed: {0}")]
    Start(String),

    /// `init` was called on a module that already left the uninitialized
    /// state. Initialization must run exactly once per page load.
    #[error("module already initialized (state: {0:?})")]
    AlreadyInitialized(InitState),

    /// `start` was called before initialization completed.
    #[error("start called before initialization completed (state: {0:?})")]
    NotReady(InitState),
}

/// Lifecycle of a loaded module handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// Loaded, init not yet attempted.
    Uninitialized,
    /// Init in flight.
    Initializing,
    /// Init completed; exported calls are safe.
    Ready,
    /// Init failed; the handle is permanently unusable.
    Failed,
}

/// A loaded wasm module's exports, as the bootstrap sequence sees them.
///
/// `init` is the default initialization export and must complete before
/// `start`; `start` takes no arguments and hands control to application
/// logic, which is opaque to the loader.
#[async_trait]
pub trait WasmModule: Send {
    /// Run the module's one-time initialization.
    ///
    /// # Errors
    ///
    /// [`BootError::ModuleInit`] if initialization fails.
    async fn init(&mut self) -> Result<(), BootError>;

    /// Invoke the module's `start` export.
    ///
    /// # Errors
    ///
    /// [`BootError::Start`] if the export throws.
    fn start(&mut self) -> Result<(), BootError>;
}

/// Wraps a [`WasmModule`] and enforces the init-before-start invariant.
#[derive(Debug)]
pub struct InitGuard<M> {
    module: M,
    state: InitState,
}

impl<M: WasmModule> InitGuard<M> {
    /// Wrap a freshly loaded module.
    pub fn new(module: M) -> Self {
        Self {
            module,
            state: InitState::Uninitialized,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> InitState {
        self.state
    }

    /// Run initialization exactly once.
    ///
    /// # Errors
    ///
    /// [`BootError::AlreadyInitialized`] if init already ran (in any
    /// direction), or the module's own [`BootError::ModuleInit`] on failure,
    /// after which the handle is permanently [`InitState::Failed`].
    pub async fn init(&mut self) -> Result<(), BootError> {
        if self.state != InitState::Uninitialized {
            return Err(BootError::AlreadyInitialized(self.state));
        }
        self.state = InitState::Initializing;
        match self.module.init().await {
            Ok(()) => {
                self.state = InitState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = InitState::Failed;
                Err(e)
            }
        }
    }

    /// Invoke `start`, permitted only after successful initialization.
    ///
    /// # Errors
    ///
    /// [`BootError::NotReady`] before init completes, or the module's own
    /// [`BootError::Start`].
    pub fn start(&mut self) -> Result<(), BootError> {
        if self.state != InitState::Ready {
            return Err(BootError::NotReady(self.state));
        }
        self.module.start()
    }
}
