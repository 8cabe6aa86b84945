//! Presence filters: keep domains that appear in at least N groups of sources.
//!
//! A group is e.g. every source of one day (inclusion by days) or every source
//! of one provider (inclusion by lists). Several filters compose by AND.

use std::collections::{HashMap, HashSet};

use futures::future::try_join_all;
use log::debug;

use crate::error_handling::GenerationError;
use crate::source::{RowReader, SourceRef};
use crate::storage::Storage;

/// Domains contained in at least `threshold` of `groups`.
pub fn count_presence(groups: &[HashSet<String>], threshold: usize) -> HashSet<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for group in groups {
        for domain in group {
            *counts.entry(domain.as_str()).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count >= threshold)
        .map(|(domain, _)| domain.to_string())
        .collect()
}

/// Union of the domains of every source in `group`, each read up to `limit` rows.
async fn domains_in_group(
    storage: &dyn Storage,
    group: &[SourceRef],
    limit: Option<usize>,
) -> Result<HashSet<String>, GenerationError> {
    let mut domains = HashSet::new();
    for source in group {
        let mut reader = RowReader::open(storage, source, limit).await?;
        while let Some(row) = reader.next_row().await? {
            domains.insert(row.domain);
        }
    }
    Ok(domains)
}

/// Domains that appear (anywhere) in at least `threshold` of `groups`.
///
/// Groups are read concurrently; ranks are ignored.
pub async fn minimum_presence_any(
    storage: &dyn Storage,
    groups: &[Vec<SourceRef>],
    limit: Option<usize>,
    threshold: usize,
) -> Result<HashSet<String>, GenerationError> {
    let sets = try_join_all(
        groups
            .iter()
            .map(|group| domains_in_group(storage, group, limit)),
    )
    .await?;
    let accepted = count_presence(&sets, threshold);
    debug!(
        "Presence filter: {} domains in at least {} of {} groups",
        accepted.len(),
        threshold,
        groups.len()
    );
    Ok(accepted)
}

/// Keeps the entries of `ranked` accepted by every filter, preserving order.
pub fn apply_filters(ranked: Vec<String>, filters: &[HashSet<String>]) -> Vec<String> {
    if filters.is_empty() {
        return ranked;
    }
    ranked
        .into_iter()
        .filter(|domain| filters.iter().all(|filter| filter.contains(domain)))
        .collect()
}
