//! Output writer and archiver.
//!
//! A generated list is stored twice: as a plain `rank,domain` CSV and as a zip
//! archive holding the first million entries under a fixed file name. The
//! archive of the canonical daily list is also republished under a well-known
//! name.

use std::io::{Cursor, Write};
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::{
    ARCHIVE_ENTRY_NAME, ARCHIVE_MAX_ENTRIES, DAILY_ARCHIVE_NAME, GENERATED_ARCHIVE_DIR,
    GENERATED_LIST_DIR,
};
use crate::error_handling::{ConfigError, GenerationError, StorageError};
use crate::identity::ListId;
use crate::storage::Storage;

/// Storage key of the plain list.
pub fn list_key(id: &ListId) -> String {
    format!("{GENERATED_LIST_DIR}/{id}.csv")
}

/// Storage key of the archive.
pub fn archive_key(id: &ListId) -> String {
    format!("{GENERATED_ARCHIVE_DIR}/tranco_{id}-1m.csv.zip")
}

/// Storage key the canonical daily archive is republished under.
pub fn daily_archive_key() -> String {
    format!("{GENERATED_ARCHIVE_DIR}/{DAILY_ARCHIVE_NAME}")
}

/// Serializes `domains` as `rank,domain` lines, ranks starting at 1.
pub fn render_list(domains: &[String]) -> Result<Vec<u8>, GenerationError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for (index, domain) in domains.iter().enumerate() {
        writer.write_record([(index + 1).to_string().as_str(), domain.as_str()])?;
    }
    writer
        .into_inner()
        .map_err(|e| GenerationError::Io(e.into_error()))
}

/// Builds the zip archive of the first [`ARCHIVE_MAX_ENTRIES`] entries.
pub fn build_archive(domains: &[String]) -> Result<Vec<u8>, GenerationError> {
    let capped = &domains[..domains.len().min(ARCHIVE_MAX_ENTRIES)];
    let body = render_list(capped)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(ARCHIVE_ENTRY_NAME, options)?;
    zip.write_all(&body)?;
    Ok(zip.finish()?.into_inner())
}

/// Number of lines requested when downloading a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListSize {
    #[default]
    Full,
    Top(usize),
}

impl ListSize {
    pub fn limit(self) -> Option<usize> {
        match self {
            ListSize::Full => None,
            ListSize::Top(n) => Some(n),
        }
    }

    /// Parses `value`, falling back to the full list when it is not understood.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for ListSize {
    type Err = ConfigError;

    /// `full`, `<n>K` (thousands) or `<n>`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("full") {
            return Ok(ListSize::Full);
        }
        let invalid = || ConfigError::InvalidValue {
            field: "size",
            value: value.to_string(),
        };
        let count = match trimmed.strip_suffix(['K', 'k']) {
            Some(thousands) => thousands
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_mul(1000)),
            None => trimmed.parse::<usize>().ok(),
        };
        match count {
            Some(n) if n > 0 => Ok(ListSize::Top(n)),
            _ => Err(invalid()),
        }
    }
}

/// Writes generated lists to, and reads them back from, the output storage.
#[derive(Clone)]
pub struct OutputWriter {
    storage: Arc<dyn Storage>,
}

impl OutputWriter {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Writes the plain list of `id`.
    pub async fn write(&self, id: &ListId, domains: &[String]) -> Result<(), GenerationError> {
        let key = list_key(id);
        self.storage.write(&key, render_list(domains)?).await?;
        info!(
            "Wrote {} entries to {}",
            domains.len(),
            self.storage.describe(&key)
        );
        Ok(())
    }

    /// Writes the archive of `id`.
    pub async fn write_archive(
        &self,
        id: &ListId,
        domains: &[String],
    ) -> Result<(), GenerationError> {
        let key = archive_key(id);
        self.storage.write(&key, build_archive(domains)?).await?;
        debug!("Wrote archive {}", self.storage.describe(&key));
        Ok(())
    }

    /// Copies the archive of `id` to the well-known daily name.
    pub async fn republish_daily(&self, id: &ListId) -> Result<(), GenerationError> {
        let target = daily_archive_key();
        self.storage
            .copy(&archive_key(id), &target)
            .await
            .map_err(GenerationError::ArchiveRepublish)?;
        info!(
            "Republished archive of {} as {}",
            id,
            self.storage.describe(&target)
        );
        Ok(())
    }

    /// First `size` lines of the plain list of `id`.
    pub async fn read_list(&self, id: &ListId, size: ListSize) -> Result<Vec<String>, StorageError> {
        self.storage.read_lines(&list_key(id), size.limit()).await
    }
}
