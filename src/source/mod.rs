//! Source lists: locating them and reading their rows.
//!
//! Every provider publishes one list per day, in two variants:
//! - **raw**: `rank,fqdn`
//! - **parts**: `rank,fqdn,registrable_domain,sld,subdomain,public_suffix,tld,is_registrable`
//!
//! The parts variant is only needed when a per-row filter is active.

mod filter;
mod reader;

use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;

use crate::config::{RankMode, SOURCE_DATE_FORMAT};
use crate::error_handling::GenerationError;
use crate::storage::Storage;

pub use filter::{filter_parts, FilteredSource, PartsFilter};
pub use reader::{parse_row, read_prefix, DomainParts, RowReader, SourceRow};

/// Variant of a daily source list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Raw,
    Parts,
}

impl SourceFormat {
    /// Columns per line.
    pub fn columns(self) -> usize {
        match self {
            SourceFormat::Raw => 2,
            SourceFormat::Parts => 8,
        }
    }
}

/// A located (provider, day) source list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    pub provider: String,
    pub date: NaiveDate,
    pub format: SourceFormat,
    /// Storage key of the list
    pub key: String,
}

/// Storage key of the list `provider` published on `date`.
pub fn source_key(provider: &str, date: NaiveDate, format: SourceFormat) -> String {
    let day = date.format(SOURCE_DATE_FORMAT);
    match format {
        SourceFormat::Raw => format!("{provider}/{provider}_{day}.csv"),
        SourceFormat::Parts => format!("{provider}/parts/{provider}_{day}_parts.csv"),
    }
}

/// Finds daily source lists in a storage backend.
#[derive(Clone)]
pub struct SourceResolver {
    storage: Arc<dyn Storage>,
}

impl SourceResolver {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Locates the list of `provider` for `date`.
    ///
    /// Fails with [`GenerationError::SourceNotFound`] if the provider has no list
    /// for that day. Ingestion is best-effort, so gaps do happen.
    pub async fn locate(
        &self,
        provider: &str,
        date: NaiveDate,
        parts: bool,
    ) -> Result<SourceRef, GenerationError> {
        let format = if parts {
            SourceFormat::Parts
        } else {
            SourceFormat::Raw
        };
        let key = source_key(provider, date, format);
        if !self.storage.exists(&key).await? {
            debug!("No source list at {}", self.storage.describe(&key));
            return Err(GenerationError::SourceNotFound {
                provider: provider.to_string(),
                date,
            });
        }
        Ok(SourceRef {
            provider: provider.to_string(),
            date,
            format,
            key,
        })
    }
}

/// Ranked entries of one source, ready for scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSource {
    /// `(rank, domain)` in source order
    pub entries: Vec<(u64, String)>,
    /// Input scale for rescaling
    pub max_rank_in: usize,
}

/// Reads a source for scoring, applying `filter` (parts lists only) and at most
/// `limit` rows.
///
/// Unfiltered sources are scaled by the number of rows read. Filtered sources are
/// scaled by the rows read before filtering in [`RankMode::Retain`], and by the
/// surviving rows in [`RankMode::Dense`].
pub async fn load_ranked(
    storage: &dyn Storage,
    source: &SourceRef,
    limit: Option<usize>,
    filter: Option<&PartsFilter>,
    mode: RankMode,
) -> Result<RankedSource, GenerationError> {
    match filter {
        None => {
            let rows = read_prefix(storage, source, limit).await?;
            let max_rank_in = rows.len();
            Ok(RankedSource {
                entries: rows.into_iter().map(|row| (row.rank, row.domain)).collect(),
                max_rank_in,
            })
        }
        Some(filter) => {
            let filtered = filter_parts(storage, source, limit, filter, mode).await?;
            let max_rank_in = match mode {
                RankMode::Retain => filtered.rows_seen,
                RankMode::Dense => filtered.entries.len(),
            };
            Ok(RankedSource {
                entries: filtered.entries,
                max_rank_in,
            })
        }
    }
}
