//! Shared utilities: constants, configuration, error types and timestamps.

pub mod config;
pub mod constants;
pub mod error;
pub mod time;
