//! The startup state machine.
//!
//! `NotStarted -> StylesheetRequested -> ModuleRequested ->
//! ModuleInitializing -> Running`, with a terminal `Failed` reachable from
//! the two module states. There are no transitions out of `Running` or
//! `Failed`, no cancellation, and no timeout beyond whatever the underlying
//! loads provide.

use async_trait::async_trait;
use tracing::error;

use crate::module::{BootError, InitGuard, WasmModule};

/// Startup progress of one page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    /// Nothing requested yet.
    NotStarted,
    /// Stylesheet load triggered (fire-and-forget).
    StylesheetRequested,
    /// Module load awaited.
    ModuleRequested,
    /// Module init awaited.
    ModuleInitializing,
    /// `start` handed control to the application. Terminal.
    Running,
    /// The load -> init -> start chain failed. Terminal.
    Failed,
}

/// Triggers the stylesheet bundle load.
///
/// Side-effecting only: styles apply to the document whenever the load
/// finishes. The bootstrap sequence never awaits its completion, so a slow
/// or failed stylesheet does not block (or fail) startup.
pub trait StylesheetLoader: Send {
    /// Kick off the load.
    fn request(&self);
}

/// Fetches and resolves the compiled wasm module.
#[async_trait]
pub trait ModuleLoader: Send {
    /// The resolved module handle type.
    type Module: WasmModule;

    /// Await the dynamic import.
    ///
    /// # Errors
    ///
    /// [`BootError::ModuleLoad`] if the import rejects.
    async fn load(&self) -> Result<Self::Module, BootError>;
}

/// Receives the single failure report of a failed bootstrap.
pub trait DiagnosticSink: Send {
    /// Report a fatal bootstrap failure.
    fn report(&self, error: &BootError);
}

/// The bootstrap sequence for one page load.
#[derive(Debug)]
pub struct Bootstrap<S, L, D> {
    stylesheet: S,
    modules: L,
    diagnostics: D,
    state: BootState,
}

impl<S, L, D> Bootstrap<S, L, D>
where
    S: StylesheetLoader,
    L: ModuleLoader,
    D: DiagnosticSink,
{
    /// Assemble a bootstrap sequence. Nothing is loaded until
    /// [`Bootstrap::run`].
    pub fn new(stylesheet: S, modules: L, diagnostics: D) -> Self {
        Self {
            stylesheet,
            modules,
            diagnostics,
            state: BootState::NotStarted,
        }
    }

    /// Current state.
    pub fn state(&self) -> BootState {
        self.state
    }

    /// Run the whole sequence and return the terminal state.
    ///
    /// Any failure is caught here, reported to the diagnostic sink exactly
    /// once, and collapses the sequence into [`BootState::Failed`]. The
    /// failure is fatal to the page; no retry is attempted.
    pub async fn run(mut self) -> BootState {
        self.stylesheet.request();
        self.state = BootState::StylesheetRequested;

        match self.load_init_start().await {
            Ok(()) => {
                self.state = BootState::Running;
            }
            Err(e) => {
                error!(error = %e, "bootstrap failed");
                self.diagnostics.report(&e);
                self.state = BootState::Failed;
            }
        }
        self.state
    }

    /// The awaited portion of the chain: load, then init, then start.
    async fn load_init_start(&mut self) -> Result<(), BootError> {
        self.state = BootState::ModuleRequested;
        let module = self.modules.load().await?;

        self.state = BootState::ModuleInitializing;
        let mut guard = InitGuard::new(module);
        guard.init().await?;
        guard.start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct Counters {
        stylesheet_requests: Arc<AtomicUsize>,
        starts: Arc<AtomicUsize>,
        reports: Arc<AtomicUsize>,
    }

    struct NoopStylesheet(Counters);
    impl StylesheetLoader for NoopStylesheet {
        fn request(&self) {
            self.0.stylesheet_requests.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingSink(Counters);
    impl DiagnosticSink for CountingSink {
        fn report(&self, _error: &BootError) {
            self.0.reports.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct TestModule {
        counters: Counters,
        fail_init: bool,
    }

    #[async_trait]
    impl WasmModule for TestModule {
        async fn init(&mut self) -> Result<(), BootError> {
            if self.fail_init {
                Err(BootError::ModuleInit("bad memory section".to_string()))
            } else {
                Ok(())
            }
        }

        fn start(&mut self) -> Result<(), BootError> {
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct TestLoader {
        counters: Counters,
        fail_load: bool,
        fail_init: bool,
    }

    #[async_trait]
    impl ModuleLoader for TestLoader {
        type Module = TestModule;

        async fn load(&self) -> Result<TestModule, BootError> {
            if self.fail_load {
                Err(BootError::ModuleLoad("network error".to_string()))
            } else {
                Ok(TestModule {
                    counters: self.counters.clone(),
                    fail_init: self.fail_init,
                })
            }
        }
    }

    fn bootstrap(
        fail_load: bool,
        fail_init: bool,
    ) -> (Bootstrap<NoopStylesheet, TestLoader, CountingSink>, Counters) {
        let counters = Counters::default();
        let boot = Bootstrap::new(
            NoopStylesheet(counters.clone()),
            TestLoader {
                counters: counters.clone(),
                fail_load,
                fail_init,
            },
            CountingSink(counters.clone()),
        );
        (boot, counters)
    }

    #[tokio::test]
    async fn successful_chain_reaches_running() {
        let (boot, counters) = bootstrap(false, false);
        assert_eq!(boot.state(), BootState::NotStarted);

        let state = boot.run().await;
        assert_eq!(state, BootState::Running);
        assert_eq!(counters.stylesheet_requests.load(Ordering::SeqCst), 1);
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        // The sink is never touched on the happy path.
        assert_eq!(counters.reports.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_import_fails_without_starting() {
        let (boot, counters) = bootstrap(true, false);
        let state = boot.run().await;

        assert_eq!(state, BootState::Failed);
        assert_eq!(counters.reports.load(Ordering::SeqCst), 1);
        assert_eq!(counters.starts.load(Ordering::SeqCst), 0);
        // The stylesheet request is fire-and-forget and already happened.
        assert_eq!(counters.stylesheet_requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejected_init_fails_without_starting() {
        let (boot, counters) = bootstrap(false, true);
        let state = boot.run().await;

        assert_eq!(state, BootState::Failed);
        assert_eq!(counters.reports.load(Ordering::SeqCst), 1);
        assert_eq!(counters.starts.load(Ordering::SeqCst), 0);
    }
}
