//! Generation orchestrator.
//!
//! Turns a list configuration into a combined ranking and records the outcome:
//!
//! ```text
//! pending ──► generating ──► succeeded
//!                        └─► failed
//! ```
//!
//! `generating` only exists in memory; the identity store sees a pending record
//! until [`ListStore::mark_finished`] is called. A generation is one unit of work:
//! any error marks the list failed, except a failed republish of the daily
//! archive, which is logged and ignored. A record leaves `pending` once: asking
//! to generate a finished identifier again is refused without touching it.
//!
//! The orchestrator does not lock against two concurrent generations of the same
//! identifier. Callers (the job dispatcher, the CLI) key deduplication on the
//! [`ListId`] returned by the identity store.

mod plan;

use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::config::ListConfig;
use crate::error_handling::GenerationError;
use crate::identity::{ListId, ListStore};
use crate::output::OutputWriter;
use crate::presence::{apply_filters, minimum_presence_any};
use crate::scoring::{max_rank_out, ScoreAccumulator};
use crate::source::{load_ranked, PartsFilter, SourceResolver};
use crate::storage::Storage;

pub use plan::SourcePlan;

/// Summary of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub list_id: ListId,
    /// Source lists combined
    pub sources: usize,
    /// Entries in the written list
    pub entries: usize,
    /// Whether the daily archive was republished under its well-known name
    pub republished: bool,
}

/// Outcome of [`Generator::ensure_generated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The list had already been generated
    Available(ListId),
    /// The list was generated by this call
    Generated(GenerationReport),
}

impl EnsureOutcome {
    pub fn list_id(&self) -> &ListId {
        match self {
            EnsureOutcome::Available(id) => id,
            EnsureOutcome::Generated(report) => &report.list_id,
        }
    }
}

/// Wires the identity store, the source storage and the output writer together.
#[derive(Clone)]
pub struct Generator {
    store: Arc<dyn ListStore>,
    resolver: SourceResolver,
    outputs: OutputWriter,
}

impl Generator {
    pub fn new(
        store: Arc<dyn ListStore>,
        sources: Arc<dyn Storage>,
        outputs: Arc<dyn Storage>,
    ) -> Self {
        Self {
            store,
            resolver: SourceResolver::new(sources),
            outputs: OutputWriter::new(outputs),
        }
    }

    pub fn store(&self) -> &dyn ListStore {
        self.store.as_ref()
    }

    pub fn outputs(&self) -> &OutputWriter {
        &self.outputs
    }

    /// Computes the combined ranking of `config` without writing anything or
    /// touching the identity store.
    pub async fn compute(&self, config: &ListConfig) -> Result<Vec<String>, GenerationError> {
        self.combine(config).await.map(|(domains, _)| domains)
    }

    /// Combined ranking plus the number of sources it was built from.
    async fn combine(&self, config: &ListConfig) -> Result<(Vec<String>, usize), GenerationError> {
        let config = config.normalized();
        config.validate()?;
        let storage = self.resolver.storage();

        let filter = PartsFilter::from_config(&config);
        let plan = SourcePlan::resolve(&self.resolver, &config, filter.is_some()).await?;

        let limit = config.input_prefix();
        let mut scores = ScoreAccumulator::new(
            config.combination_method,
            max_rank_out(config.list_prefix),
        );
        for source in plan.sources() {
            let ranked =
                load_ranked(storage, source, limit, filter.as_ref(), config.rank_mode).await?;
            debug!(
                "Folding {} entries of {} (scale {})",
                ranked.entries.len(),
                storage.describe(&source.key),
                ranked.max_rank_in
            );
            scores.fold(ranked);
        }
        let ranked = scores.into_ranked();

        let mut filters = Vec::new();
        if let Some(threshold) = config.inclusion_days {
            filters.push(minimum_presence_any(storage, &plan.by_date(), limit, threshold).await?);
        }
        if let Some(threshold) = config.inclusion_lists {
            filters
                .push(minimum_presence_any(storage, &plan.by_provider(), limit, threshold).await?);
        }

        let before = ranked.len();
        let ranked = apply_filters(ranked, &filters);
        if !filters.is_empty() {
            debug!(
                "Presence filters kept {} of {} domains",
                ranked.len(),
                before
            );
        }
        Ok((ranked, plan.len()))
    }

    /// Generates the list `id` for `config` and records the outcome.
    ///
    /// Every error is logged and leaves the record marked failed before it is
    /// returned. A record that already finished is rejected with
    /// [`GenerationError::AlreadyFinished`] and keeps its state.
    pub async fn generate(
        &self,
        id: &ListId,
        config: &ListConfig,
    ) -> Result<GenerationReport, GenerationError> {
        let record = self.store.record_for(id).await?;
        if record.finished {
            warn!("List {} is already {}, not generating it again", id, record.status());
            return Err(GenerationError::AlreadyFinished {
                list_id: id.to_string(),
                status: record.status().to_string(),
            });
        }

        let started = Instant::now();
        info!(
            "Generating list {} ({} providers, {} to {}, {}, prefix {:?})",
            id,
            config.providers.len(),
            config.start_date,
            config.end_date,
            config.combination_method,
            config.list_prefix
        );

        let report = match self.run(id, config).await {
            Ok(report) => report,
            Err(e) => {
                error!("Generation of list {} failed: {}", id, e);
                self.mark_failed(id).await;
                return Err(e);
            }
        };

        if let Err(e) = self.store.mark_finished(id, false).await {
            error!("Failed to record success of list {}: {}", id, e);
            self.mark_failed(id).await;
            return Err(e.into());
        }

        info!(
            "Generated list {}: {} entries from {} sources in {:.2}s",
            id,
            report.entries,
            report.sources,
            started.elapsed().as_secs_f64()
        );
        Ok(report)
    }

    /// Generates the list behind an existing identifier.
    pub async fn generate_by_id(&self, id: &ListId) -> Result<GenerationReport, GenerationError> {
        let config = self.store.config_for(id).await?;
        self.generate(id, &config).await
    }

    /// Identifier of `config`, creating a pending record if needed.
    pub async fn request(&self, config: &ListConfig) -> Result<ListId, GenerationError> {
        let config = config.normalized();
        config.validate()?;
        Ok(self.store.resolve_or_create(&config, false).await?)
    }

    /// Returns the list of `config`, generating it first unless it is available.
    ///
    /// A previously failed record is skipped, so this retries with a fresh one.
    pub async fn ensure_generated(
        &self,
        config: &ListConfig,
    ) -> Result<EnsureOutcome, GenerationError> {
        let config = config.normalized();
        config.validate()?;
        let id = self.store.resolve_or_create(&config, true).await?;
        if self.store.is_available(&id).await? {
            info!("List {} is already available", id);
            return Ok(EnsureOutcome::Available(id));
        }
        self.generate(&id, &config).await.map(EnsureOutcome::Generated)
    }

    async fn run(
        &self,
        id: &ListId,
        config: &ListConfig,
    ) -> Result<GenerationReport, GenerationError> {
        let (domains, sources) = self.combine(config).await?;

        self.outputs.write(id, &domains).await?;
        self.outputs.write_archive(id, &domains).await?;

        let republished = if config.is_daily_list {
            match self.outputs.republish_daily(id).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("List {} generated, but {}", id, e);
                    false
                }
            }
        } else {
            false
        };

        Ok(GenerationReport {
            list_id: id.clone(),
            sources,
            entries: domains.len(),
            republished,
        })
    }

    async fn mark_failed(&self, id: &ListId) {
        if let Err(e) = self.store.mark_finished(id, true).await {
            error!("Failed to record failure of list {}: {}", id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{daily_config, CombinationMethod, ListPrefix, RankMode};
    use crate::error_handling::DatabaseError;
    use crate::identity::ListRecord;
    use crate::output::{archive_key, daily_archive_key, list_key};
    use crate::source::{source_key, SourceFormat};
    use crate::storage::LocalStorage;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory store recording every lifecycle transition.
    #[derive(Default)]
    struct FakeStore {
        records: Mutex<Vec<(ListConfig, bool, bool)>>,
        marks: Mutex<Vec<bool>>,
        reject_success: bool,
    }

    impl FakeStore {
        fn key(id: &ListId) -> Option<usize> {
            id.as_str().strip_prefix("L")?.parse().ok()
        }
    }

    #[async_trait]
    impl ListStore for FakeStore {
        async fn resolve_or_create(
            &self,
            config: &ListConfig,
            skip_failed: bool,
        ) -> Result<ListId, DatabaseError> {
            if let Some(id) = self.find(config, skip_failed).await? {
                return Ok(id);
            }
            let mut records = self.records.lock().unwrap();
            records.push((config.clone(), false, false));
            Ok(ListId::new(format!("L{}", records.len())))
        }

        async fn find(
            &self,
            config: &ListConfig,
            skip_failed: bool,
        ) -> Result<Option<ListId>, DatabaseError> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .position(|(c, _, failed)| c == config && !(skip_failed && *failed))
                .map(|i| ListId::new(format!("L{}", i + 1))))
        }

        async fn record_for(&self, id: &ListId) -> Result<ListRecord, DatabaseError> {
            let not_found = || DatabaseError::NotFound(id.to_string());
            let key = Self::key(id).ok_or_else(not_found)?;
            let records = self.records.lock().unwrap();
            let (config, finished, failed) = records.get(key - 1).cloned().ok_or_else(not_found)?;
            Ok(ListRecord {
                key: key as i64,
                list_id: id.clone(),
                config,
                finished,
                failed,
                creation_date: String::new(),
                creation_time: String::new(),
            })
        }

        async fn mark_finished(&self, id: &ListId, failed: bool) -> Result<(), DatabaseError> {
            self.marks.lock().unwrap().push(failed);
            if !failed && self.reject_success {
                return Err(DatabaseError::NotFound("rejected".to_string()));
            }
            let key = Self::key(id).ok_or_else(|| DatabaseError::NotFound(id.to_string()))?;
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(key - 1)
                .ok_or_else(|| DatabaseError::NotFound(id.to_string()))?;
            record.1 = true;
            record.2 = failed;
            Ok(())
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn config() -> ListConfig {
        ListConfig {
            start_date: day(),
            end_date: day(),
            providers: vec!["p".to_string(), "q".to_string()],
            combination_method: CombinationMethod::Dowdall,
            list_prefix: ListPrefix::Full,
            filter_pld: false,
            filter_tlds: None,
            filter_organization: false,
            filter_subdomains: None,
            inclusion_days: None,
            inclusion_lists: None,
            rank_mode: RankMode::Retain,
            is_daily_list: false,
        }
    }

    async fn generator(tmp: &TempDir, store: Arc<FakeStore>) -> (Generator, Arc<LocalStorage>) {
        let sources = Arc::new(LocalStorage::new(tmp.path().join("archive")));
        for (provider, body) in [("p", "1,a.com\n2,b.com\n"), ("q", "1,b.com\n2,c.com\n")] {
            sources
                .write(
                    &source_key(provider, day(), SourceFormat::Raw),
                    body.as_bytes().to_vec(),
                )
                .await
                .unwrap();
        }
        let outputs = Arc::new(LocalStorage::new(tmp.path()));
        (Generator::new(store, sources, outputs.clone()), outputs)
    }

    #[tokio::test]
    async fn test_compute_has_no_side_effects() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(FakeStore::default());
        let (generator, outputs) = generator(&tmp, store.clone()).await;

        let ranked = generator.compute(&config()).await.unwrap();
        // b.com: 1/1e6 + 1, a.com: 1, c.com: 1/1e6
        assert_eq!(ranked, vec!["b.com", "a.com", "c.com"]);
        assert!(store.records.lock().unwrap().is_empty());
        assert!(!outputs.path("generated_lists").exists());
    }

    #[tokio::test]
    async fn test_generate_writes_and_marks_success() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(FakeStore::default());
        let (generator, outputs) = generator(&tmp, store.clone()).await;

        let id = generator.request(&config()).await.unwrap();
        let report = generator.generate_by_id(&id).await.unwrap();
        assert_eq!(report.entries, 3);
        assert_eq!(report.sources, 2);
        assert!(!report.republished);

        assert!(outputs.exists(&list_key(&id)).await.unwrap());
        assert!(outputs.exists(&archive_key(&id)).await.unwrap());
        assert!(!outputs.exists(&daily_archive_key()).await.unwrap());
        assert_eq!(*store.marks.lock().unwrap(), vec![false]);
        assert!(store.is_available(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_success_mark_falls_back_to_failed() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(FakeStore {
            reject_success: true,
            ..Default::default()
        });
        let (generator, _) = generator(&tmp, store.clone()).await;

        let id = generator.request(&config()).await.unwrap();
        let result = generator.generate(&id, &config()).await;
        assert!(matches!(result, Err(GenerationError::Database(_))));
        assert_eq!(*store.marks.lock().unwrap(), vec![false, true]);
        assert!(!store.is_available(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_sources_mark_failed() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(FakeStore::default());
        let (generator, _) = generator(&tmp, store.clone()).await;

        // The daily configuration needs parts files that do not exist here
        let daily = daily_config(day());
        let id = generator.request(&daily).await.unwrap();
        let result = generator.generate(&id, &daily).await;
        assert!(matches!(result, Err(GenerationError::SourceNotFound { .. })));
        assert_eq!(*store.marks.lock().unwrap(), vec![true]);
    }

    #[tokio::test]
    async fn test_ensure_generated_reuses_available_list() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(FakeStore::default());
        let (generator, _) = generator(&tmp, store.clone()).await;

        let first = generator.ensure_generated(&config()).await.unwrap();
        assert!(matches!(first, EnsureOutcome::Generated(_)));
        let second = generator.ensure_generated(&config()).await.unwrap();
        assert_eq!(second, EnsureOutcome::Available(first.list_id().clone()));
        assert_eq!(store.marks.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_finished_list_is_not_generated_again() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(FakeStore::default());
        let (generator, _) = generator(&tmp, store.clone()).await;

        let id = generator.request(&config()).await.unwrap();
        generator.generate_by_id(&id).await.unwrap();

        // A redelivered job whose sources are gone must not flip the record
        std::fs::remove_dir_all(tmp.path().join("archive")).unwrap();
        let again = generator.generate_by_id(&id).await;
        assert!(matches!(
            again,
            Err(GenerationError::AlreadyFinished { ref status, .. }) if status == "succeeded"
        ));
        assert_eq!(*store.marks.lock().unwrap(), vec![false]);
        assert!(store.is_available(&id).await.unwrap());
    }
}
