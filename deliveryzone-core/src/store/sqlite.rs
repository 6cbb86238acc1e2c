//! SQLite-backed catalog of stores and postcode centroids.

use std::path::{Path, PathBuf};

use geo::Rect;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};
use thiserror::Error;

use crate::hours::parse_time_of_day;
use crate::{
    BackendError, Coordinate, CoordinateError, OpeningHours, Postcode, PostcodeStore, Store,
    StoreError, StoreId,
};

use super::{StoreRepository, parse_timezone};

/// Tables read by [`SqliteCatalog`] and written by the importer.
///
/// Statements are idempotent so the batch can run against an existing
/// database.
pub const CATALOG_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS postcodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    postcode TEXT NOT NULL UNIQUE,
    lat REAL NOT NULL,
    lng REAL NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS stores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    postcode TEXT NOT NULL,
    lat REAL NOT NULL,
    lng REAL NOT NULL,
    delivery_radius_km REAL NOT NULL DEFAULT 5.0,
    timezone TEXT NOT NULL DEFAULT 'Europe/London',
    opens_at TEXT,
    closes_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS postcodes_lat_lng ON postcodes (lat, lng);
CREATE INDEX IF NOT EXISTS stores_lat_lng ON stores (lat, lng);
CREATE INDEX IF NOT EXISTS stores_postcode ON stores (postcode);
";

const STORE_COLUMNS: &str =
    "id, name, postcode, lat, lng, delivery_radius_km, timezone, opens_at, closes_at";

/// Create the catalog tables if they are missing.
///
/// # Errors
/// Returns the `rusqlite` error raised by the DDL batch.
pub fn initialise_schema(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(CATALOG_SCHEMA)
}

/// Error raised when reading or validating persisted catalog rows.
#[derive(Debug, Error)]
pub enum SqliteCatalogError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A persisted latitude or longitude was out of range.
    #[error("{table} row {key} has an invalid coordinate: {source}")]
    InvalidCoordinate {
        /// Table holding the row.
        table: &'static str,
        /// Postcode or store identifier of the row.
        key: String,
        /// Validation failure.
        #[source]
        source: CoordinateError,
    },
    /// A persisted store failed validation.
    #[error("store {id} is invalid: {source}")]
    InvalidStore {
        /// Identifier of the store.
        id: StoreId,
        /// Validation failure.
        #[source]
        source: StoreError,
    },
    /// Generic SQLite error when reading rows.
    #[error(transparent)]
    Query(#[from] rusqlite::Error),
}

/// Read-only catalog backed by a SQLite database.
///
/// One catalog implements both [`StoreRepository`] and [`PostcodeStore`].
/// Bounding-box queries use a `BETWEEN` filter on the `(lat, lng)` index and
/// return stores ordered by identifier.
#[derive(Debug)]
pub struct SqliteCatalog {
    connection: Connection,
}

impl SqliteCatalog {
    /// Open the catalog at `path` read-only.
    ///
    /// # Errors
    /// Returns [`SqliteCatalogError::OpenDatabase`] when the file cannot be
    /// opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SqliteCatalogError> {
        let database = path.as_ref();
        let connection = Connection::open_with_flags(database, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| SqliteCatalogError::OpenDatabase {
                path: database.to_path_buf(),
                source,
            })?;
        Ok(Self { connection })
    }

    /// Wrap an existing connection.
    #[must_use]
    pub const fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }

    /// The underlying connection, for callers that also write to it.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    fn stores_in_bbox(&self, bbox: &Rect<f64>) -> Result<Vec<Store>, SqliteCatalogError> {
        let query = format!(
            "SELECT {STORE_COLUMNS} FROM stores \
             WHERE lat BETWEEN ?1 AND ?2 AND lng BETWEEN ?3 AND ?4 ORDER BY id"
        );
        let mut statement = self.connection.prepare_cached(&query)?;
        let rows = statement
            .query_map(
                params![bbox.min().y, bbox.max().y, bbox.min().x, bbox.max().x],
                StoreRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(StoreRow::into_store).collect()
    }

    fn store_by_id(&self, id: StoreId) -> Result<Option<Store>, SqliteCatalogError> {
        let query = format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = ?1");
        let mut statement = self.connection.prepare_cached(&query)?;
        let row = statement
            .query_row(params![id.get()], StoreRow::from_row)
            .optional()?;
        row.map(StoreRow::into_store).transpose()
    }

    fn postcode_location(
        &self,
        postcode: &Postcode,
    ) -> Result<Option<Coordinate>, SqliteCatalogError> {
        let mut statement = self
            .connection
            .prepare_cached("SELECT lat, lng FROM postcodes WHERE postcode = ?1")?;
        let row: Option<(f64, f64)> = statement
            .query_row(params![postcode.as_str()], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;
        row.map(|(lat, lng)| {
            Coordinate::new(lat, lng).map_err(|source| SqliteCatalogError::InvalidCoordinate {
                table: "postcodes",
                key: postcode.to_string(),
                source,
            })
        })
        .transpose()
    }
}

impl StoreRepository for SqliteCatalog {
    fn find_in_bbox(&self, bbox: &Rect<f64>) -> Result<Vec<Store>, BackendError> {
        self.stores_in_bbox(bbox)
            .map_err(|err| BackendError::new("store bounding-box query", err))
    }

    fn find_by_id(&self, id: StoreId) -> Result<Option<Store>, BackendError> {
        self.store_by_id(id)
            .map_err(|err| BackendError::new("store lookup", err))
    }
}

impl PostcodeStore for SqliteCatalog {
    fn find_by_normalized_code(
        &self,
        postcode: &Postcode,
    ) -> Result<Option<Coordinate>, BackendError> {
        self.postcode_location(postcode)
            .map_err(|err| BackendError::new("postcode lookup", err))
    }
}

/// Raw column values, validated after the row closure returns.
struct StoreRow {
    id: u64,
    name: String,
    postcode: String,
    lat: f64,
    lng: f64,
    delivery_radius_km: f64,
    timezone: String,
    opens_at: Option<String>,
    closes_at: Option<String>,
}

impl StoreRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            postcode: row.get(2)?,
            lat: row.get(3)?,
            lng: row.get(4)?,
            delivery_radius_km: row.get(5)?,
            timezone: row.get(6)?,
            opens_at: row.get(7)?,
            closes_at: row.get(8)?,
        })
    }

    fn into_store(self) -> Result<Store, SqliteCatalogError> {
        let id = StoreId::new(self.id);
        let invalid = |source| SqliteCatalogError::InvalidStore { id, source };
        let location = Coordinate::new(self.lat, self.lng).map_err(|source| {
            SqliteCatalogError::InvalidCoordinate {
                table: "stores",
                key: id.to_string(),
                source,
            }
        })?;
        let timezone = parse_timezone(&self.timezone).map_err(invalid)?;
        let opens_at = parse_column("opens_at", self.opens_at.as_deref()).map_err(invalid)?;
        let closes_at = parse_column("closes_at", self.closes_at.as_deref()).map_err(invalid)?;

        Store::new(
            id,
            self.name,
            Postcode::new(&self.postcode),
            location,
            self.delivery_radius_km,
        )
        .map(|store| {
            store
                .with_timezone(timezone)
                .with_hours(OpeningHours::from_bounds(opens_at, closes_at))
        })
        .map_err(invalid)
    }
}

fn parse_column(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<chrono::NaiveTime>, StoreError> {
    raw.map(|value| {
        parse_time_of_day(value).ok_or_else(|| StoreError::InvalidTime {
            field,
            value: value.to_owned(),
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpeningWindow;
    use crate::test_support::{sample_store, write_sqlite_catalog};
    use chrono::NaiveTime;
    use geo::Coord;
    use rstest::{fixture, rstest};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[fixture]
    fn temp_db() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("catalog.db");
        (dir, path)
    }

    fn bbox(min: (f64, f64), max: (f64, f64)) -> Rect<f64> {
        Rect::new(Coord { x: min.0, y: min.1 }, Coord { x: max.0, y: max.1 })
    }

    #[rstest]
    fn returns_stores_inside_the_box_in_id_order(
        #[from(temp_db)] (_dir, path): (TempDir, PathBuf),
    ) {
        let stores = vec![
            sample_store(3, 51.52, -0.10, 5.0),
            sample_store(1, 51.50, -0.14, 5.0),
            sample_store(2, 53.48, -2.25, 5.0),
        ];
        write_sqlite_catalog(&path, &stores, &[]).expect("persist catalog");
        let catalog = SqliteCatalog::open(&path).expect("open catalog");

        let found = catalog
            .find_in_bbox(&bbox((-0.5, 51.0), (0.5, 52.0)))
            .expect("query succeeds");
        let ids: Vec<_> = found.iter().map(|store| store.id.get()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[rstest]
    fn includes_stores_on_the_boundary(#[from(temp_db)] (_dir, path): (TempDir, PathBuf)) {
        let store = sample_store(1, 51.5, -0.1, 5.0);
        write_sqlite_catalog(&path, std::slice::from_ref(&store), &[]).expect("persist catalog");
        let catalog = SqliteCatalog::open(&path).expect("open catalog");

        let found = catalog
            .find_in_bbox(&bbox((-0.1, 51.5), (0.0, 51.6)))
            .expect("query succeeds");
        assert_eq!(found, vec![store]);
    }

    #[rstest]
    fn round_trips_hours_and_timezone(#[from(temp_db)] (_dir, path): (TempDir, PathBuf)) {
        let window = OpeningWindow::new(
            NaiveTime::from_hms_opt(22, 0, 0).expect("valid time"),
            NaiveTime::from_hms_opt(2, 0, 0).expect("valid time"),
        );
        let store = sample_store(7, 40.71, -74.0, 3.0)
            .with_timezone(chrono_tz::America::New_York)
            .with_hours(OpeningHours::Window(window));
        write_sqlite_catalog(&path, std::slice::from_ref(&store), &[]).expect("persist catalog");
        let catalog = SqliteCatalog::open(&path).expect("open catalog");

        assert_eq!(
            catalog.find_by_id(StoreId::new(7)).expect("query succeeds"),
            Some(store)
        );
        assert_eq!(
            catalog.find_by_id(StoreId::new(8)).expect("query succeeds"),
            None
        );
    }

    #[rstest]
    fn resolves_postcodes_exactly(#[from(temp_db)] (_dir, path): (TempDir, PathBuf)) {
        let palace = Coordinate::new(51.501_009, -0.141_588).expect("valid coordinate");
        let record = crate::PostcodeRecord {
            postcode: Postcode::new("SW1A 1AA"),
            location: palace,
        };
        write_sqlite_catalog(&path, &[], &[record]).expect("persist catalog");
        let catalog = SqliteCatalog::open(&path).expect("open catalog");

        assert_eq!(
            catalog
                .find_by_normalized_code(&Postcode::new("sw1a 1aa"))
                .expect("query succeeds"),
            Some(palace)
        );
        assert_eq!(
            catalog
                .find_by_normalized_code(&Postcode::new("SW1A1AA"))
                .expect("query succeeds"),
            None
        );
    }

    #[rstest]
    fn rejects_rows_with_unknown_timezones(#[from(temp_db)] (_dir, path): (TempDir, PathBuf)) {
        let connection = Connection::open(&path).expect("create SQLite database");
        initialise_schema(&connection).expect("create schema");
        connection
            .execute(
                "INSERT INTO stores (id, name, postcode, lat, lng, timezone, created_at, updated_at)
                 VALUES (1, 'Lost', 'E1 6AN', 51.5, -0.07, 'Mars/Olympus', '', '')",
                [],
            )
            .expect("insert row");

        let error = SqliteCatalog::from_connection(connection)
            .store_by_id(StoreId::new(1))
            .expect_err("invalid timezone should fail");
        assert!(matches!(
            error,
            SqliteCatalogError::InvalidStore {
                source: StoreError::UnknownTimezone { .. },
                ..
            }
        ));
    }

    #[rstest]
    fn missing_tables_surface_as_backend_errors(
        #[from(temp_db)] (_dir, path): (TempDir, PathBuf),
    ) {
        let _empty = Connection::open(&path).expect("create SQLite database");
        let catalog = SqliteCatalog::open(&path).expect("open catalog");
        let error = catalog
            .find_in_bbox(&bbox((0.0, 0.0), (1.0, 1.0)))
            .expect_err("missing table should fail");
        assert_eq!(error.operation(), "store bounding-box query");
    }

    #[rstest]
    fn open_reports_missing_files(#[from(temp_db)] (_dir, path): (TempDir, PathBuf)) {
        let error = SqliteCatalog::open(&path).expect_err("missing database should fail");
        assert!(matches!(error, SqliteCatalogError::OpenDatabase { .. }));
    }
}
