//! Glue between the command line and the library crates.
//!
//! Resolves the cache location, assembles the acquisition sources for a
//! fetch, and collects manually entered periods.

pub(crate) mod cache_manager;
pub(crate) mod data_pipeline;
pub(crate) mod manual_prompt;
