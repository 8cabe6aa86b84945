//! List identity: identifier encoding and the configuration store.

mod codec;
mod store;

pub use codec::{IdCodec, ListId};
pub use store::{ListRecord, ListStatus, ListStore, SqliteListStore};
