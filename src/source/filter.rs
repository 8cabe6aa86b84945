//! Per-row filters over parts-format source lists.

use std::collections::HashSet;

use crate::config::{ListConfig, RankMode};
use crate::error_handling::GenerationError;
use crate::source::{RowReader, SourceFormat, SourceRef};
use crate::storage::Storage;

/// Row predicates derived from a list configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartsFilter {
    /// Keep only rows that are registrable domains themselves
    pub registrable_only: bool,
    /// Allowed top-level labels
    pub tlds: Option<HashSet<String>>,
    /// Allowed subdomain labels
    pub subdomains: Option<HashSet<String>>,
    /// Keep only the first row seen per second-level label
    pub one_per_organization: bool,
}

impl PartsFilter {
    /// Filter for `config`, or `None` if no per-row filter is active.
    pub fn from_config(config: &ListConfig) -> Option<Self> {
        if !config.requires_parts() {
            return None;
        }
        let set = |values: &Option<Vec<String>>| {
            values
                .as_ref()
                .filter(|v| !v.is_empty())
                .map(|v| v.iter().cloned().collect::<HashSet<_>>())
        };
        Some(Self {
            registrable_only: config.filter_pld,
            tlds: set(&config.filter_tlds),
            subdomains: set(&config.filter_subdomains),
            one_per_organization: config.filter_organization,
        })
    }
}

/// Output of [`filter_parts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredSource {
    /// Surviving `(rank, fqdn)` pairs in source order
    pub entries: Vec<(u64, String)>,
    /// Rows read before filtering
    pub rows_seen: usize,
}

/// Reads up to `limit` rows of a parts-format source and keeps those passing
/// `filter`.
///
/// Checks run in a fixed order: TLD, subdomain, organization, registrable. An
/// organization is claimed by the first row that reaches the organization check,
/// even if that row is then dropped by the registrable check.
pub async fn filter_parts(
    storage: &dyn Storage,
    source: &SourceRef,
    limit: Option<usize>,
    filter: &PartsFilter,
    mode: RankMode,
) -> Result<FilteredSource, GenerationError> {
    if source.format != SourceFormat::Parts {
        return Err(GenerationError::MalformedRow {
            source_key: source.key.clone(),
            line: 0,
            reason: "per-row filters need the parts variant".to_string(),
        });
    }

    let mut reader = RowReader::open(storage, source, limit).await?;
    let mut organizations_seen = HashSet::new();
    let mut entries = Vec::new();

    while let Some(row) = reader.next_row().await? {
        let Some(parts) = row.parts else {
            continue;
        };
        if filter.tlds.as_ref().is_some_and(|t| !t.contains(&parts.tld)) {
            continue;
        }
        if filter
            .subdomains
            .as_ref()
            .is_some_and(|s| !s.contains(&parts.subdomain))
        {
            continue;
        }
        if filter.one_per_organization && !organizations_seen.insert(parts.second_level) {
            continue;
        }
        if filter.registrable_only && !parts.is_registrable {
            continue;
        }

        let rank = match mode {
            RankMode::Retain => row.rank,
            RankMode::Dense => entries.len() as u64 + 1,
        };
        entries.push((rank, row.domain));
    }

    Ok(FilteredSource {
        entries,
        rows_seen: reader.rows_read(),
    })
}
