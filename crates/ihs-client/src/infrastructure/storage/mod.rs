//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads and writes the TOML configuration file,
//! including the persisted device identity, and supplies defaults on first
//! run.

pub mod config;
