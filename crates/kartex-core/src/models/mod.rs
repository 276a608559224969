//! Data models: extraction records, configuration, and builtin data.

pub mod config;
pub mod embedded;
pub mod record;
