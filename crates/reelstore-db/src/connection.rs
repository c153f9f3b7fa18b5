//! Cache database location and opening.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rusqlite::Connection;

use super::migrations::run_migrations;

/// File holding persisted TMDB responses.
const CACHE_DB_FILE_NAME: &str = "tmdb_cache.db";

/// How long a write waits on another `reelstore` process holding the lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (or creates) the response cache database and runs migrations.
///
/// Location: `{dir}/tmdb_cache.db`, then `$XDG_DATA_HOME/reelstore/`,
/// then `~/.local/share/reelstore/`.
///
/// # Errors
///
/// Returns an error if no location can be resolved, or the database cannot
/// be opened or migrated.
pub fn open_cache_db(dir: Option<&Path>) -> Result<Connection> {
    let xdg = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from);
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let db_path = cache_db_path_from(dir, xdg.as_deref(), home.as_deref())?;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open cache database {}", db_path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set cache database busy timeout")?;
    run_migrations(&conn).context("cache database migration failed")?;

    tracing::debug!(path = %db_path.display(), "cache database opened");
    Ok(conn)
}

/// Opens a migrated in-memory cache database.
///
/// # Errors
///
/// Returns an error if the database cannot be created or migrations fail.
pub fn open_in_memory_cache_db() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory cache database")?;
    run_migrations(&conn).context("cache database migration failed")?;
    Ok(conn)
}

fn cache_db_path_from(dir: Option<&Path>, xdg: Option<&Path>, home: Option<&Path>) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.join(CACHE_DB_FILE_NAME));
    }

    let data_home = match (xdg.filter(|p| p.is_absolute()), home) {
        (Some(xdg), _) => xdg.to_path_buf(),
        (None, Some(home)) => home.join(".local").join("share"),
        (None, None) => bail!("HOME environment variable is not set"),
    };
    Ok(data_home.join("reelstore").join(CACHE_DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_open_cache_db_creates_nested_dir() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().join("nested");

        // Act
        let conn = open_cache_db(Some(&dir_path)).unwrap();

        // Assert
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert!(version > 0);
        assert!(dir_path.join(CACHE_DB_FILE_NAME).exists());
    }

    #[test]
    fn test_reopen_keeps_rows() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let conn = open_cache_db(Some(dir.path())).unwrap();
        crate::save_entry(&conn, "tmdb_cache_movie_details_105", "{}").unwrap();
        drop(conn);

        // Act
        let reopened = open_cache_db(Some(dir.path())).unwrap();

        // Assert
        assert_eq!(
            crate::list_keys(&reopened).unwrap(),
            vec![String::from("tmdb_cache_movie_details_105")]
        );
    }

    #[test]
    fn test_in_memory_cache_db_is_migrated() {
        // Arrange & Act
        let conn = open_in_memory_cache_db().unwrap();

        // Assert
        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_path_prefers_dir() {
        // Arrange & Act
        let path = cache_db_path_from(
            Some(Path::new("/srv/reelstore")),
            Some(Path::new("/xdg")),
            Some(Path::new("/home/u")),
        )
        .unwrap();

        // Assert
        assert_eq!(path, PathBuf::from("/srv/reelstore/tmdb_cache.db"));
    }

    #[test]
    fn test_path_uses_xdg_data_home() {
        // Arrange & Act
        let path =
            cache_db_path_from(None, Some(Path::new("/xdg")), Some(Path::new("/home/u"))).unwrap();

        // Assert
        assert_eq!(path, PathBuf::from("/xdg/reelstore/tmdb_cache.db"));
    }

    #[test]
    fn test_path_falls_back_to_local_share() {
        // Arrange & Act
        let path =
            cache_db_path_from(None, Some(Path::new("relative")), Some(Path::new("/home/u")))
                .unwrap();

        // Assert
        assert_eq!(path, PathBuf::from("/home/u/.local/share/reelstore/tmdb_cache.db"));
    }

    #[test]
    fn test_path_without_home_is_an_error() {
        // Arrange & Act
        let result = cache_db_path_from(None, None, None);

        // Assert
        assert!(result.is_err());
    }
}
