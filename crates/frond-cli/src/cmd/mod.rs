//! Command modules - one file per CLI command

pub mod build;
pub mod clean;
pub mod serve;
