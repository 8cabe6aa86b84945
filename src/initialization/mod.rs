//! Application initialization and resource setup.
//!
//! This module builds the shared resources the CLI hands to the generator:
//! - Logger
//! - Source and output storage backends
//! - Configuration database and identity store

mod logger;

use std::sync::Arc;

use log::info;

use crate::config::{AppConfig, StorageBackend};
use crate::database::{init_db_pool_with_path, run_migrations};
use crate::error_handling::InitializationError;
use crate::identity::{IdCodec, SqliteListStore};
use crate::storage::{LocalStorage, Storage};

pub use logger::init_logger_with;

/// Source and output storage backends.
pub struct Storages {
    /// Daily provider lists
    pub sources: Arc<dyn Storage>,
    /// Generated lists and archives
    pub outputs: Arc<dyn Storage>,
}

/// Builds the storage backends selected by `config`.
///
/// # Errors
///
/// Returns `InitializationError::StorageSetupError` if the S3 backend is selected
/// without both buckets, or in a build without the `s3` feature.
pub async fn init_storage(config: &AppConfig) -> Result<Storages, InitializationError> {
    match config.backend {
        StorageBackend::Local => {
            let root = &config.storage_root;
            info!("Using local storage under {}", root.display());
            Ok(Storages {
                sources: Arc::new(LocalStorage::new(root.join("archive"))),
                outputs: Arc::new(LocalStorage::new(root)),
            })
        }
        StorageBackend::S3 => init_s3_storage(config).await,
    }
}

#[cfg(feature = "s3")]
async fn init_s3_storage(config: &AppConfig) -> Result<Storages, InitializationError> {
    use crate::storage::S3Storage;

    let bucket = |value: &Option<String>, name: &str| {
        value.clone().ok_or_else(|| {
            InitializationError::StorageSetupError(format!("--{name} is required with the s3 backend"))
        })
    };
    let source_bucket = bucket(&config.source_bucket, "source-bucket")?;
    let output_bucket = bucket(&config.output_bucket, "output-bucket")?;
    info!(
        "Using S3 storage: sources in {}, outputs in {}",
        source_bucket, output_bucket
    );
    Ok(Storages {
        sources: Arc::new(S3Storage::from_env(source_bucket, config.s3_prefix.as_str()).await),
        outputs: Arc::new(S3Storage::from_env(output_bucket, config.s3_prefix.as_str()).await),
    })
}

#[cfg(not(feature = "s3"))]
async fn init_s3_storage(_config: &AppConfig) -> Result<Storages, InitializationError> {
    Err(InitializationError::StorageSetupError(
        "this build does not include the s3 backend (enable the `s3` feature)".to_string(),
    ))
}

/// Opens the configuration database, applies migrations and wraps it in a
/// [`SqliteListStore`].
pub async fn init_list_store(config: &AppConfig) -> Result<SqliteListStore, InitializationError> {
    let pool = init_db_pool_with_path(&config.db_path).await?;
    run_migrations(&pool).await?;
    let codec = IdCodec::with_salt(&config.id_salt)?;
    Ok(SqliteListStore::new(pool, codec))
}
