//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (rank scale, archive naming, identifier encoding)
//! - The typed list configuration and the raw request form it is validated from
//! - CLI option types and parsing

mod constants;
mod list;
mod types;

// Re-export all constants
pub use constants::*;
pub use list::{
    daily_config, date_window, resolve_day, CombinationMethod, ListConfig, ListPrefix, RankMode,
    RawListConfig,
};
pub use types::{AppConfig, Command, LogFormat, LogLevel, RequestArgs, StorageBackend};
