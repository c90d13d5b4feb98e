//! Bootstrap loader: asset acquisition and application startup sequencing.
//!
//! One instance runs per page load. The sequence is fixed: the stylesheet
//! load is triggered and never awaited (styles apply whenever they arrive),
//! the wasm module load *is* awaited, its one-time initialization is awaited,
//! and only then is the module's `start` export called.
//!
//! Failure anywhere in the load -> init -> start chain is caught once at the
//! top and routed to a [`DiagnosticSink`]; it never propagates further. There
//! is deliberately no retry and no fallback UI -- a failed bootstrap leaves
//! the page without an application, and that gap is surfaced here rather
//! than papered over.

pub mod boot;
pub mod module;

pub use boot::{BootState, Bootstrap, DiagnosticSink, ModuleLoader, StylesheetLoader};
pub use module::{BootError, InitGuard, InitState, WasmModule};
