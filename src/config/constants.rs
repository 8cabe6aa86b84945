//! Configuration constants.
//!
//! This module defines the constants shared by the combination engine, the
//! identity store and the output writer.

/// Largest rank any combined list is rescaled to.
///
/// Every source list is mapped onto `1..=min(GLOBAL_MAX_RANK, prefix)` before
/// scores are accumulated, so a short list cannot outweigh a long one.
pub const GLOBAL_MAX_RANK: usize = 1_000_000;

/// Number of entries written into the compressed archive of a list.
pub const ARCHIVE_MAX_ENTRIES: usize = 1_000_000;

/// File name of the list inside the compressed archive.
pub const ARCHIVE_ENTRY_NAME: &str = "top-1m.csv";

/// Well-known name the canonical daily archive is republished under.
pub const DAILY_ARCHIVE_NAME: &str = "top-1m.csv.zip";

/// Directory (or key prefix) holding generated plain lists.
pub const GENERATED_LIST_DIR: &str = "generated_lists";

/// Directory (or key prefix) holding generated archives.
pub const GENERATED_ARCHIVE_DIR: &str = "generated_lists_zip";

// List identifier encoding
pub const LIST_ID_SALT: &str = "tsr";
pub const LIST_ID_MIN_LENGTH: usize = 4;
pub const LIST_ID_ALPHABET: &str = "BCDFGHJKLMNPQRSTVWXYZ23456789";

/// Default SQLite database holding list configurations.
pub const DB_PATH: &str = "./domain_rankings.db";

/// Date format used in list configurations and CLI arguments.
pub const DATE_FORMAT_WITH_HYPHEN: &str = "%Y-%m-%d";

/// Date format embedded in source file names.
pub const SOURCE_DATE_FORMAT: &str = "%Y%m%d";

// Default daily list
pub const DAILY_WINDOW_DAYS: i64 = 30;
pub const DAILY_PROVIDERS: &[&str] = &["alexa", "umbrella", "majestic", "quantcast"];
