//! SQLite persistence for list configurations.
//!
//! This module owns the connection pool and the schema; the identity store in
//! [`crate::identity`] issues the queries.

pub mod migrations;
pub mod pool;
#[cfg(test)]
pub(crate) mod test_helpers;

pub use migrations::run_migrations;
pub use pool::init_db_pool_with_path;
