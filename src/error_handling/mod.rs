//! Error handling.
//!
//! This module defines the error types of every layer:
//! - **Initialization**: logger and backend set-up
//! - **Database**: identity store and migrations
//! - **Storage**: byte-stream backends (local files, object storage)
//! - **Config**: validation of list requests
//! - **Generation**: everything that can abort building a combined list

mod types;

pub use types::{ConfigError, DatabaseError, GenerationError, InitializationError, StorageError};
