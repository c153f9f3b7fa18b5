//! Persistent key/value store backing the catalog cache.
//!
//! Uses `rusqlite` (bundled `SQLite`) so cached TMDB responses survive
//! restarts. Values are opaque text; callers own the serialization format.

/// Cache entry CRUD operations.
pub mod entries;
mod connection;
mod migrations;

#[allow(clippy::module_name_repetitions)]
pub use connection::{open_cache_db, open_in_memory_cache_db};
pub use entries::{delete_entries_with_prefix, delete_entry, list_keys, load_entry, save_entry};
