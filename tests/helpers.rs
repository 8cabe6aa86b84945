// Shared test helpers: an in-memory identity store and a temporary storage tree.

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

use domain_rankings::database::run_migrations;
use domain_rankings::source::{source_key, SourceFormat};
use domain_rankings::{
    CombinationMethod, Generator, IdCodec, ListConfig, ListPrefix, LocalStorage, RankMode,
    SqliteListStore, Storage,
};

/// Creates an in-memory database pool with migrations applied.
#[allow(dead_code)] // Used by other test files
pub async fn create_test_pool() -> SqlitePool {
    // One connection, otherwise each connection gets its own empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

#[allow(dead_code)]
pub fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid test date")
}

/// A raw-source configuration without filters.
#[allow(dead_code)]
pub fn plain_config(
    providers: &[&str],
    start: NaiveDate,
    end: NaiveDate,
    method: CombinationMethod,
) -> ListConfig {
    ListConfig {
        start_date: start,
        end_date: end,
        providers: providers.iter().map(|p| p.to_string()).collect(),
        combination_method: method,
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

/// Storage tree, identity store and generator for one test.
#[allow(dead_code)]
pub struct TestEnv {
    pub root: TempDir,
    pub sources: Arc<LocalStorage>,
    pub outputs: Arc<LocalStorage>,
    pub store: Arc<SqliteListStore>,
    pub generator: Generator,
}

#[allow(dead_code)]
impl TestEnv {
    pub async fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let sources = Arc::new(LocalStorage::new(root.path().join("archive")));
        let outputs = Arc::new(LocalStorage::new(root.path()));
        let pool = create_test_pool().await;
        let store = Arc::new(SqliteListStore::new(
            Arc::new(pool),
            IdCodec::new().expect("Failed to build codec"),
        ));
        let generator = Generator::new(store.clone(), sources.clone(), outputs.clone());
        Self {
            root,
            sources,
            outputs,
            store,
            generator,
        }
    }

    /// Writes a raw `rank,fqdn` source list.
    pub async fn write_raw(&self, provider: &str, date: NaiveDate, lines: &[&str]) {
        self.write(source_key(provider, date, SourceFormat::Raw), lines)
            .await;
    }

    /// Writes a parts-format source list.
    pub async fn write_parts(&self, provider: &str, date: NaiveDate, lines: &[&str]) {
        self.write(source_key(provider, date, SourceFormat::Parts), lines)
            .await;
    }

    async fn write(&self, key: String, lines: &[&str]) {
        let mut body = lines.join("\n");
        body.push('\n');
        self.sources
            .write(&key, body.into_bytes())
            .await
            .expect("Failed to write source list");
    }
}
