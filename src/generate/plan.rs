//! Source plan: every (provider, day) list a generation reads.

use chrono::NaiveDate;
use futures::future::try_join_all;

use crate::config::ListConfig;
use crate::error_handling::GenerationError;
use crate::source::{SourceRef, SourceResolver};

/// Resolved sources of one configuration, indexed by day and by provider.
#[derive(Debug, Clone)]
pub struct SourcePlan {
    sources: Vec<SourceRef>,
    dates: Vec<NaiveDate>,
    providers: Vec<String>,
}

impl SourcePlan {
    /// Locates the list of every configured provider for every day of the window.
    ///
    /// Any missing list fails the whole plan.
    pub async fn resolve(
        resolver: &SourceResolver,
        config: &ListConfig,
        parts: bool,
    ) -> Result<Self, GenerationError> {
        let dates = config.dates();
        let providers = config.providers.clone();

        let lookups = providers.iter().flat_map(|provider| {
            dates
                .iter()
                .map(move |date| resolver.locate(provider, *date, parts))
        });
        let sources = try_join_all(lookups).await?;

        Ok(Self {
            sources,
            dates,
            providers,
        })
    }

    /// All sources, provider by provider, each in date order.
    pub fn sources(&self) -> &[SourceRef] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// One group per day of the window.
    pub fn by_date(&self) -> Vec<Vec<SourceRef>> {
        self.dates
            .iter()
            .map(|date| {
                self.sources
                    .iter()
                    .filter(|s| s.date == *date)
                    .cloned()
                    .collect()
            })
            .collect()
    }

    /// One group per provider, in configuration order.
    pub fn by_provider(&self) -> Vec<Vec<SourceRef>> {
        self.providers
            .iter()
            .map(|provider| {
                self.sources
                    .iter()
                    .filter(|s| &s.provider == provider)
                    .cloned()
                    .collect()
            })
            .collect()
    }
}
