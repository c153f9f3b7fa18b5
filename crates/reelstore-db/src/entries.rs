//! Cache entry CRUD operations.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

/// Loads the payload stored under `key`.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn load_entry(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT payload FROM cache_entries WHERE cache_key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("failed to load cache entry {key}"))
}

/// Inserts or replaces the payload stored under `key`.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn save_entry(conn: &Connection, key: &str, payload: &str) -> Result<()> {
    let updated_at = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO cache_entries (cache_key, payload, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(cache_key) DO UPDATE SET
            payload = excluded.payload,
            updated_at = excluded.updated_at",
        rusqlite::params![key, payload, updated_at],
    )
    .with_context(|| format!("failed to save cache entry {key}"))?;
    Ok(())
}

/// Deletes the entry stored under `key`. Returns whether a row was removed.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn delete_entry(conn: &Connection, key: &str) -> Result<bool> {
    let rows = conn
        .execute("DELETE FROM cache_entries WHERE cache_key = ?1", [key])
        .with_context(|| format!("failed to delete cache entry {key}"))?;
    Ok(rows > 0)
}

/// Deletes every entry whose key starts with `prefix`. Returns the number of rows removed.
///
/// The prefix is compared literally; `_` and `%` carry no wildcard meaning.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn delete_entries_with_prefix(conn: &Connection, prefix: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM cache_entries WHERE substr(cache_key, 1, length(?1)) = ?1",
        [prefix],
    )
    .with_context(|| format!("failed to delete cache entries with prefix {prefix}"))
}

/// Lists all stored keys in ascending order.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_keys(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT cache_key FROM cache_entries ORDER BY cache_key")
        .context("failed to prepare cache key query")?;

    let rows = stmt
        .query_map([], |row| row.get(0))
        .context("failed to query cache keys")?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to read cache key rows")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::open_in_memory_cache_db;

    #[test]
    fn test_load_missing_entry() {
        // Arrange
        let conn = open_in_memory_cache_db().unwrap();

        // Act
        let loaded = load_entry(&conn, "nope").unwrap();

        // Assert
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_and_load_entry() {
        // Arrange
        let conn = open_in_memory_cache_db().unwrap();

        // Act
        save_entry(&conn, "tmdb_cache_movie_details_105", "{\"a\":1}").unwrap();
        let loaded = load_entry(&conn, "tmdb_cache_movie_details_105").unwrap();

        // Assert
        assert_eq!(loaded.as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_save_overwrites_existing_entry() {
        // Arrange
        let conn = open_in_memory_cache_db().unwrap();
        save_entry(&conn, "k", "old").unwrap();

        // Act
        save_entry(&conn, "k", "new").unwrap();

        // Assert
        assert_eq!(load_entry(&conn, "k").unwrap().as_deref(), Some("new"));
        assert_eq!(list_keys(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_entry() {
        // Arrange
        let conn = open_in_memory_cache_db().unwrap();
        save_entry(&conn, "k", "v").unwrap();

        // Act
        let removed = delete_entry(&conn, "k").unwrap();
        let removed_again = delete_entry(&conn, "k").unwrap();

        // Assert
        assert!(removed);
        assert!(!removed_again);
        assert!(load_entry(&conn, "k").unwrap().is_none());
    }

    #[test]
    fn test_delete_with_prefix_keeps_other_keys() {
        // Arrange
        let conn = open_in_memory_cache_db().unwrap();
        save_entry(&conn, "tmdb_cache_movie_details_1", "a").unwrap();
        save_entry(&conn, "tmdb_cache_discover_page_1_all", "b").unwrap();
        save_entry(&conn, "member_session", "c").unwrap();
        // `_` must not act as a wildcard.
        save_entry(&conn, "tmdbXcacheXother", "d").unwrap();

        // Act
        let removed = delete_entries_with_prefix(&conn, "tmdb_cache_").unwrap();

        // Assert
        assert_eq!(removed, 2);
        assert_eq!(
            list_keys(&conn).unwrap(),
            vec![String::from("member_session"), String::from("tmdbXcacheXother")]
        );
    }
}
