//! Configuration identity store.
//!
//! Maps a canonical list configuration to a stable [`ListId`] and tracks the
//! lifecycle of the list generated for it:
//!
//! ```text
//! pending (finished = 0) ──► succeeded (finished = 1, failed = 0)
//!                        └─► failed    (finished = 1, failed = 1)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use sqlx::{Row, SqlitePool};
use strum_macros::Display;

use crate::config::{ListConfig, DATE_FORMAT_WITH_HYPHEN};
use crate::error_handling::DatabaseError;
use crate::identity::{IdCodec, ListId};

/// Lifecycle state of a list record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ListStatus {
    /// Created, not yet generated (or generation still running)
    Pending,
    /// Generated and available for download
    Succeeded,
    /// Generation failed
    Failed,
}

/// A stored list configuration plus its lifecycle fields.
#[derive(Debug, Clone)]
pub struct ListRecord {
    /// Numeric key, assigned once at creation
    pub key: i64,
    /// Public identifier derived from `key`
    pub list_id: ListId,
    /// The configuration the list was requested with
    pub config: ListConfig,
    pub finished: bool,
    pub failed: bool,
    /// Creation date (`YYYY-MM-DD`, UTC)
    pub creation_date: String,
    /// Creation time (RFC 3339, UTC)
    pub creation_time: String,
}

impl ListRecord {
    pub fn status(&self) -> ListStatus {
        match (self.finished, self.failed) {
            (false, _) => ListStatus::Pending,
            (true, false) => ListStatus::Succeeded,
            (true, true) => ListStatus::Failed,
        }
    }

    /// Whether the generated list can be served.
    pub fn is_available(&self) -> bool {
        self.status() == ListStatus::Succeeded
    }
}

/// Find-or-create store for list configurations.
///
/// The store is the single source of truth for "does this configuration already
/// have a record"; callers that dispatch generations key their deduplication on
/// the returned identifier.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Returns the identifier of the record matching `config`, creating a pending
    /// record if there is none. With `skip_failed`, failed records are ignored, so a
    /// failed list gets a fresh record.
    async fn resolve_or_create(
        &self,
        config: &ListConfig,
        skip_failed: bool,
    ) -> Result<ListId, DatabaseError>;

    /// Like [`ListStore::resolve_or_create`] but never inserts.
    async fn find(
        &self,
        config: &ListConfig,
        skip_failed: bool,
    ) -> Result<Option<ListId>, DatabaseError>;

    /// Fetches the record behind `id`.
    ///
    /// Fails with [`DatabaseError::NotFound`] if `id` does not decode or has no record.
    async fn record_for(&self, id: &ListId) -> Result<ListRecord, DatabaseError>;

    /// Fetches the configuration behind `id`.
    async fn config_for(&self, id: &ListId) -> Result<ListConfig, DatabaseError> {
        Ok(self.record_for(id).await?.config)
    }

    /// True iff the record exists, is finished and did not fail.
    async fn is_available(&self, id: &ListId) -> Result<bool, DatabaseError> {
        match self.record_for(id).await {
            Ok(record) => Ok(record.is_available()),
            Err(DatabaseError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Moves the record to a terminal state.
    ///
    /// Repeating the same outcome is a no-op. Replacing a different terminal outcome
    /// is logged and then applied.
    async fn mark_finished(&self, id: &ListId, failed: bool) -> Result<(), DatabaseError>;
}

/// [`ListStore`] backed by the SQLite `lists` table.
#[derive(Debug, Clone)]
pub struct SqliteListStore {
    pool: Arc<SqlitePool>,
    codec: IdCodec,
}

impl SqliteListStore {
    pub fn new(pool: Arc<SqlitePool>, codec: IdCodec) -> Self {
        Self { pool, codec }
    }

    pub fn codec(&self) -> &IdCodec {
        &self.codec
    }

    fn decode(&self, id: &ListId) -> Result<i64, DatabaseError> {
        self.codec
            .decode(id)
            .ok_or_else(|| DatabaseError::NotFound(id.to_string()))
    }

    async fn find_key(&self, canonical: &str, skip_failed: bool) -> Result<Option<i64>, DatabaseError> {
        let key = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM lists
             WHERE config = ? AND (? = 0 OR failed = 0)
             ORDER BY failed ASC, id ASC
             LIMIT 1",
        )
        .bind(canonical)
        .bind(skip_failed)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(key)
    }
}

#[async_trait]
impl ListStore for SqliteListStore {
    async fn resolve_or_create(
        &self,
        config: &ListConfig,
        skip_failed: bool,
    ) -> Result<ListId, DatabaseError> {
        let canonical = config.canonical_json()?;
        let now = Utc::now();

        // Find-or-insert in a single statement, so two concurrent callers with the
        // same configuration cannot both insert.
        let inserted = sqlx::query(
            "INSERT INTO lists (config, finished, failed, creation_date, creation_time)
             SELECT ?, 0, 0, ?, ?
             WHERE NOT EXISTS (
                 SELECT 1 FROM lists WHERE config = ? AND (? = 0 OR failed = 0)
             )",
        )
        .bind(&canonical)
        .bind(now.format(DATE_FORMAT_WITH_HYPHEN).to_string())
        .bind(now.to_rfc3339())
        .bind(&canonical)
        .bind(skip_failed)
        .execute(self.pool.as_ref())
        .await?
        .rows_affected();

        let key = self
            .find_key(&canonical, skip_failed)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(canonical.clone()))?;
        let list_id = self.codec.encode(key);

        if inserted > 0 {
            info!("Created list record {} (key {})", list_id, key);
        } else {
            debug!("Configuration already known as list {}", list_id);
        }
        Ok(list_id)
    }

    async fn find(
        &self,
        config: &ListConfig,
        skip_failed: bool,
    ) -> Result<Option<ListId>, DatabaseError> {
        let canonical = config.canonical_json()?;
        Ok(self
            .find_key(&canonical, skip_failed)
            .await?
            .map(|key| self.codec.encode(key)))
    }

    async fn record_for(&self, id: &ListId) -> Result<ListRecord, DatabaseError> {
        let key = self.decode(id)?;
        let row = sqlx::query(
            "SELECT id, config, finished, failed, creation_date, creation_time
             FROM lists WHERE id = ?",
        )
        .bind(key)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(id.to_string()))?;

        let config_json: String = row.try_get("config")?;
        Ok(ListRecord {
            key: row.try_get("id")?,
            list_id: id.clone(),
            config: serde_json::from_str(&config_json)?,
            finished: row.try_get("finished")?,
            failed: row.try_get("failed")?,
            creation_date: row.try_get("creation_date")?,
            creation_time: row.try_get("creation_time")?,
        })
    }

    async fn mark_finished(&self, id: &ListId, failed: bool) -> Result<(), DatabaseError> {
        let key = self.decode(id)?;
        let current = sqlx::query("SELECT finished, failed FROM lists WHERE id = ?")
            .bind(key)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(id.to_string()))?;

        let was_finished: bool = current.try_get("finished")?;
        let was_failed: bool = current.try_get("failed")?;
        if was_finished {
            if was_failed == failed {
                debug!("List {} already marked finished (failed={})", id, failed);
                return Ok(());
            }
            warn!(
                "List {} changes terminal outcome: failed={} -> failed={}",
                id, was_failed, failed
            );
        }

        sqlx::query("UPDATE lists SET finished = 1, failed = ? WHERE id = ?")
            .bind(failed)
            .bind(key)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::daily_config;
    use crate::database::test_helpers::create_test_pool;
    use chrono::NaiveDate;

    async fn test_store() -> SqliteListStore {
        let pool = create_test_pool().await;
        SqliteListStore::new(Arc::new(pool), IdCodec::new().unwrap())
    }

    fn config() -> ListConfig {
        daily_config(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
    }

    async fn record_count(store: &SqliteListStore) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM lists")
            .fetch_one(store.pool.as_ref())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_or_create_is_idempotent() {
        let store = test_store().await;
        let first = store.resolve_or_create(&config(), false).await.unwrap();
        let second = store.resolve_or_create(&config(), false).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(record_count(&store).await, 1);
    }

    #[tokio::test]
    async fn test_distinct_configs_get_increasing_keys() {
        let store = test_store().await;
        let a = store.resolve_or_create(&config(), false).await.unwrap();
        let mut other = config();
        other.providers.truncate(1);
        let b = store.resolve_or_create(&other, false).await.unwrap();
        assert_ne!(a, b);

        let key_a = store.record_for(&a).await.unwrap().key;
        let key_b = store.record_for(&b).await.unwrap().key;
        assert!(key_b > key_a);
    }

    #[tokio::test]
    async fn test_new_record_is_pending() {
        let store = test_store().await;
        let id = store.resolve_or_create(&config(), false).await.unwrap();
        let record = store.record_for(&id).await.unwrap();
        assert_eq!(record.status(), ListStatus::Pending);
        assert_eq!(record.config, config());
        assert_eq!(record.creation_date.len(), 10);
        assert!(!store.is_available(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_finished_success_and_failure() {
        let store = test_store().await;
        let id = store.resolve_or_create(&config(), false).await.unwrap();

        store.mark_finished(&id, false).await.unwrap();
        assert!(store.is_available(&id).await.unwrap());
        assert_eq!(
            store.record_for(&id).await.unwrap().status(),
            ListStatus::Succeeded
        );

        // Same outcome again is a no-op
        store.mark_finished(&id, false).await.unwrap();
        assert!(store.is_available(&id).await.unwrap());

        // A different outcome is applied (and logged)
        store.mark_finished(&id, true).await.unwrap();
        assert!(!store.is_available(&id).await.unwrap());
        assert_eq!(
            store.record_for(&id).await.unwrap().status(),
            ListStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_skip_failed_creates_fresh_record() {
        let store = test_store().await;
        let failed_id = store.resolve_or_create(&config(), false).await.unwrap();
        store.mark_finished(&failed_id, true).await.unwrap();

        // Without skip_failed the failed record is returned
        assert_eq!(
            store.resolve_or_create(&config(), false).await.unwrap(),
            failed_id
        );

        let retry_id = store.resolve_or_create(&config(), true).await.unwrap();
        assert_ne!(retry_id, failed_id);
        assert_eq!(record_count(&store).await, 2);

        // Once a non-failed record exists it is preferred
        assert_eq!(
            store.find(&config(), false).await.unwrap(),
            Some(retry_id.clone())
        );
        assert_eq!(store.find(&config(), true).await.unwrap(), Some(retry_id));
    }

    #[tokio::test]
    async fn test_find_does_not_insert() {
        let store = test_store().await;
        assert_eq!(store.find(&config(), false).await.unwrap(), None);
        assert_eq!(record_count(&store).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_identifiers() {
        let store = test_store().await;
        let bogus = ListId::new("not-an-id");
        assert!(matches!(
            store.config_for(&bogus).await,
            Err(DatabaseError::NotFound(_))
        ));
        assert!(!store.is_available(&bogus).await.unwrap());

        // Decodes fine but has no record
        let unused = store.codec().encode(999);
        assert!(matches!(
            store.record_for(&unused).await,
            Err(DatabaseError::NotFound(_))
        ));
        assert!(matches!(
            store.mark_finished(&unused, false).await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_resolve_creates_one_record() {
        let store = Arc::new(test_store().await);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.resolve_or_create(&config(), false).await.unwrap()
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(record_count(&store).await, 1);
    }
}
