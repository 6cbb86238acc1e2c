//! Creation of the on-disk SQLite catalog.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use chrono::{SecondsFormat, Utc};
use deliveryzone_core::store::initialise_schema;
use rusqlite::{Connection, Error as SqliteError};
use thiserror::Error;

/// Errors raised while opening or initialising the catalog.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Failed to create the parent directory for the SQLite artefact.
    #[error("failed to create parent directory {path:?}")]
    CreateDirectory {
        /// Path of the directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Destination database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating the catalog tables failed.
    #[error("failed to create catalog tables")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Open the catalog at `path` for writing, creating it if needed.
///
/// Parent directories are created and the `postcodes` and `stores` tables are
/// initialised when missing. Existing data is left untouched.
///
/// # Errors
/// Returns [`SchemaError`] naming the step that failed.
///
/// # Examples
/// ```
/// use camino::Utf8PathBuf;
/// use deliveryzone_data::open_catalog;
///
/// let dir = tempfile::TempDir::new().expect("create temp dir");
/// let path = Utf8PathBuf::from_path_buf(dir.path().join("data/catalog.db")).expect("utf-8 path");
/// let connection = open_catalog(&path).expect("open catalog");
///
/// let tables: i64 = connection
///     .query_row(
///         "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('postcodes', 'stores')",
///         [],
///         |row| row.get(0),
///     )
///     .expect("count tables");
/// assert_eq!(tables, 2);
/// ```
pub fn open_catalog(path: &Utf8Path) -> Result<Connection, SchemaError> {
    ensure_parent_dir(path)?;
    let connection =
        Connection::open(path.as_std_path()).map_err(|source| SchemaError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    initialise_schema(&connection).map_err(|source| SchemaError::CreateSchema { source })?;
    Ok(connection)
}

/// RFC 3339 timestamp written to `created_at` and `updated_at`.
pub(crate) fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn ensure_parent_dir(path: &Utf8Path) -> Result<(), SchemaError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base_dir, relative) = base_dir_and_relative(parent)?;
    base_dir
        .create_dir_all(&relative)
        .map_err(|source| SchemaError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })
}

fn base_dir_and_relative(parent: &Utf8Path) -> Result<(fs_utf8::Dir, Utf8PathBuf), SchemaError> {
    let (base, relative) = if parent.is_absolute() {
        ("/", parent.strip_prefix("/").unwrap_or(parent))
    } else {
        (".", parent)
    };

    let dir = fs_utf8::Dir::open_ambient_dir(base, ambient_authority()).map_err(|source| {
        SchemaError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        }
    })?;

    Ok((dir, relative.to_path_buf()))
}
