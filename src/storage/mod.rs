//! Byte-stream storage backends.
//!
//! Source lists, generated lists and archives are all addressed by a relative,
//! `/`-separated key. The same key layout works on a local directory tree
//! ([`LocalStorage`]) and on an object-storage bucket (`S3Storage`, behind the
//! `s3` feature).

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error_handling::StorageError;

pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

/// Buffered reader over one stored object, consumed line by line.
pub type LineReader = Pin<Box<dyn AsyncBufRead + Send>>;

/// Uniform access to named byte streams.
///
/// Implementations must tolerate concurrent use from generations of different
/// lists; writes to one key never affect another key.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Whether an object exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Opens `key` for streaming reads.
    ///
    /// Returns [`StorageError::NotFound`] if there is no such object.
    async fn open(&self, key: &str) -> Result<LineReader, StorageError>;

    /// Reads the whole object.
    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Replaces the object under `key` with `bytes`.
    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Copies the object under `from` to `to`, overwriting `to`.
    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError>;

    /// Human-readable location of `key`, for logs.
    fn describe(&self, key: &str) -> String;

    /// Reads at most `limit` lines (all lines if `None`), without line terminators.
    async fn read_lines(
        &self,
        key: &str,
        limit: Option<usize>,
    ) -> Result<Vec<String>, StorageError> {
        let mut lines = self.open(key).await?.lines();
        let mut out = Vec::new();
        while limit.map_or(true, |limit| out.len() < limit) {
            match lines
                .next_line()
                .await
                .map_err(|e| StorageError::io(key, e))?
            {
                Some(line) => out.push(line),
                None => break,
            }
        }
        Ok(out)
    }
}
