//! Shared configuration types for the frond build pipeline.
//!
//! Everything in here is constructed once per build invocation and immutable
//! afterwards. The pipeline runner in `frond-core` consumes these values; it
//! never mutates them.

pub mod config;
pub mod hash;

// Re-exports
pub use config::*;
pub use hash::ContentHash;
