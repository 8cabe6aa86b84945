//! domain_rankings library: combine daily domain top lists into one ranking
//!
//! Several providers publish a ranked list of popular domains every day. This
//! crate combines the lists of a date window into a single ranking with a
//! positional voting method (Borda or Dowdall), optional per-row filters and
//! presence rules, and stores the result under a short, stable identifier.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::NaiveDate;
//! use domain_rankings::{daily_config, Generator, IdCodec, LocalStorage, SqliteListStore};
//! use domain_rankings::database::{init_db_pool_with_path, run_migrations};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = init_db_pool_with_path(std::path::Path::new("lists.db")).await?;
//! run_migrations(&pool).await?;
//! let store = Arc::new(SqliteListStore::new(pool, IdCodec::new()?));
//!
//! let generator = Generator::new(
//!     store,
//!     Arc::new(LocalStorage::new("/data/archive")),
//!     Arc::new(LocalStorage::new("/data")),
//! );
//! let day = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
//! let outcome = generator.ensure_generated(&daily_config(day)).await?;
//! println!("Daily list: {}", outcome.list_id());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

pub mod config;
pub mod database;
pub mod error_handling;
pub mod generate;
pub mod identity;
pub mod initialization;
pub mod output;
pub mod presence;
pub mod scoring;
pub mod source;
pub mod storage;

// Re-export public API
pub use config::{
    daily_config, AppConfig, CombinationMethod, ListConfig, ListPrefix, RankMode, RawListConfig,
};
pub use error_handling::{
    ConfigError, DatabaseError, GenerationError, InitializationError, StorageError,
};
pub use generate::{EnsureOutcome, GenerationReport, Generator};
pub use identity::{IdCodec, ListId, ListRecord, ListStatus, ListStore, SqliteListStore};
pub use output::{ListSize, OutputWriter};
pub use storage::{LocalStorage, Storage};
