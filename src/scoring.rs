//! Rank rescaling and score accumulation.
//!
//! Source lists differ in length; a domain at #100 of a 1,000-entry list should
//! not weigh as much as one at #100 of a 1,000,000-entry list. Every rank is
//! therefore mapped linearly onto the common scale `1..=max_rank_out` before its
//! contribution is computed.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::{CombinationMethod, ListPrefix, GLOBAL_MAX_RANK};
use crate::source::RankedSource;

/// Maps `rank` from `1..=max_rank_in` onto `min_rank_out..=max_rank_out`.
///
/// The boundaries are exact: rank 1 maps to `min_rank_out` and rank
/// `max_rank_in` maps to `max_rank_out`. A source with a single row has no scale
/// to map from; its rows map to `min_rank_out`.
pub fn rescale(rank: u64, max_rank_in: usize, min_rank_out: f64, max_rank_out: f64) -> f64 {
    if max_rank_in <= 1 {
        return min_rank_out;
    }
    min_rank_out + (rank as f64 - 1.0) * (max_rank_out - min_rank_out) / (max_rank_in as f64 - 1.0)
}

/// Upper end of the common scale for a requested prefix.
pub fn max_rank_out(prefix: ListPrefix) -> usize {
    match prefix.limit() {
        Some(limit) => limit.min(GLOBAL_MAX_RANK),
        None => GLOBAL_MAX_RANK,
    }
}

impl CombinationMethod {
    /// Score a source adds to the domain it ranks at `rank`.
    pub fn contribution(self, rank: u64, max_rank_in: usize, max_rank_out: usize) -> f64 {
        let out = max_rank_out as f64;
        let rescaled = rescale(rank, max_rank_in, 1.0, out);
        match self {
            CombinationMethod::Borda => out + 1.0 - rescaled,
            CombinationMethod::Dowdall => 1.0 / rescaled,
        }
    }
}

/// Accumulated score per domain, folded one source at a time.
#[derive(Debug, Clone)]
pub struct ScoreAccumulator {
    method: CombinationMethod,
    max_rank_out: usize,
    scores: HashMap<String, f64>,
}

impl ScoreAccumulator {
    pub fn new(method: CombinationMethod, max_rank_out: usize) -> Self {
        Self {
            method,
            max_rank_out,
            scores: HashMap::new(),
        }
    }

    /// Adds the contributions of one source.
    pub fn fold(&mut self, source: RankedSource) {
        for (rank, domain) in source.entries {
            let contribution = self
                .method
                .contribution(rank, source.max_rank_in, self.max_rank_out);
            *self.scores.entry(domain).or_insert(0.0) += contribution;
        }
    }

    /// Merges another accumulator built with the same method and scale.
    pub fn merge(&mut self, other: ScoreAccumulator) {
        for (domain, score) in other.scores {
            *self.scores.entry(domain).or_insert(0.0) += score;
        }
    }

    pub fn score(&self, domain: &str) -> Option<f64> {
        self.scores.get(domain).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Domains by descending score, ties by ascending name.
    pub fn into_ranked(self) -> Vec<String> {
        let mut scored: Vec<(String, f64)> = self.scores.into_iter().collect();
        sort_by_score(&mut scored);
        scored.into_iter().map(|(domain, _)| domain).collect()
    }
}

/// Sorts by descending score, breaking ties by ascending domain name.
pub fn sort_by_score(scored: &mut [(String, f64)]) {
    scored.sort_by(|(a_domain, a_score), (b_domain, b_score)| {
        match b_score.total_cmp(a_score) {
            Ordering::Equal => a_domain.cmp(b_domain),
            other => other,
        }
    });
}
