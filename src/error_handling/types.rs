//! Error type definitions.

use chrono::NaiveDate;
use log::SetLoggerError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error setting up a storage backend.
    #[error("Storage initialization error: {0}")]
    StorageSetupError(String),

    /// Error opening the configuration database.
    #[error("Database initialization error: {0}")]
    DatabaseSetupError(#[from] DatabaseError),

    /// Error building the list identifier codec.
    #[error("List identifier codec error: {0}")]
    IdCodecError(String),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Schema migration error.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// A stored configuration could not be (de)serialized.
    #[error("Configuration serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The identifier does not decode, or no record exists for it.
    #[error("Unknown list identifier: {0}")]
    NotFound(String),
}

/// Error types for storage backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No object exists under the key.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Local I/O failed.
    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote backend failed.
    #[error("Storage backend error on {key}: {message}")]
    Backend { key: String, message: String },
}

impl StorageError {
    /// Maps an I/O error on `key`, turning `NotFound` into [`StorageError::NotFound`].
    pub fn io(key: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Io {
                key: key.to_string(),
                source,
            }
        }
    }

    /// Creates a backend error for `key`.
    pub fn backend(key: &str, message: impl std::fmt::Display) -> Self {
        StorageError::Backend {
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

/// Error types for list request validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Combination method other than `borda` or `dowdall`.
    #[error("Unsupported combination method: {0}")]
    UnsupportedMethod(String),

    /// A required request field is absent.
    #[error("Missing configuration field: {0}")]
    MissingField(&'static str),

    /// A field holds a value that cannot be used.
    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    /// A date is not in `YYYY-MM-DD` form.
    #[error("Invalid date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// The window ends before it starts.
    #[error("Date range is inverted: {start} is after {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    /// The provider list is empty.
    #[error("No providers configured")]
    NoProviders,

    /// A provider is listed more than once.
    #[error("Provider {0:?} is listed more than once")]
    DuplicateProvider(String),
}

/// Error types that abort the generation of a combined list.
///
/// Any of these marks the list as failed, with two exceptions. `ArchiveRepublish`
/// is only logged, since the list itself has already been written.
/// `AlreadyFinished` is returned before any work starts and leaves the record
/// untouched.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// A (provider, day) source list does not exist.
    #[error("Source list for provider {provider:?} on {date} not found")]
    SourceNotFound { provider: String, date: NaiveDate },

    /// A source line does not have the expected shape.
    #[error("Malformed row at {source_key}:{line}: {reason}")]
    MalformedRow {
        source_key: String,
        line: usize,
        reason: String,
    },

    /// Combination method other than `borda` or `dowdall`.
    #[error("Unsupported combination method: {0}")]
    UnsupportedMethod(String),

    /// The list configuration is invalid.
    #[error("Invalid list configuration: {0}")]
    InvalidConfig(ConfigError),

    /// The record has already succeeded or failed and is never generated again.
    #[error("List {list_id} is already {status}")]
    AlreadyFinished { list_id: String, status: String },

    /// Copying the daily archive to its well-known name failed.
    #[error("Failed to republish daily archive: {0}")]
    ArchiveRepublish(#[source] StorageError),

    /// Storage backend failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Identity store failure.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// CSV serialization failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Archive creation failure.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// In-memory I/O failure while assembling output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for GenerationError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnsupportedMethod(method) => GenerationError::UnsupportedMethod(method),
            other => GenerationError::InvalidConfig(other),
        }
    }
}
