//! Batched import of postcode centroids from CSV.
//!
//! The header row must name `postcode`, `lat` and `lng` columns in any order;
//! other columns are ignored. Rows whose postcode normalises to nothing, or
//! whose coordinates are not valid numbers within range, are skipped and
//! counted. Accepted rows are upserted on the postcode so re-importing a file
//! refreshes coordinates in place.

use std::{fs::File, io::Read};

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, StringRecord, Trim};
use deliveryzone_core::{Coordinate, Postcode, PostcodeRecord};
use log::{debug, info, warn};
use rusqlite::{Connection, Error as SqliteError, params};
use thiserror::Error;

use crate::schema::timestamp_now;

/// Rows written per transaction unless the caller chooses otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

const UPSERT_POSTCODE: &str = "INSERT INTO postcodes (postcode, lat, lng, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?4)
     ON CONFLICT(postcode) DO UPDATE SET
         lat = excluded.lat,
         lng = excluded.lng,
         updated_at = excluded.updated_at";

/// Counters reported once an import completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Data rows read, excluding the header.
    pub processed: usize,
    /// Rows rejected for a blank postcode or unusable coordinates.
    pub skipped: usize,
    /// Rows inserted or updated.
    pub imported: usize,
}

/// Errors raised while importing postcodes.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The CSV file does not exist.
    #[error("CSV not found: {path}")]
    MissingFile {
        /// Path that was requested.
        path: Utf8PathBuf,
    },
    /// The CSV file exists but could not be opened.
    #[error("unable to open CSV {path}")]
    OpenFile {
        /// Path that was requested.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The input has no header row.
    #[error("CSV input is empty")]
    EmptyFile,
    /// A required column is absent from the header row.
    #[error("CSV missing required column: {column}")]
    MissingColumn {
        /// Name of the missing column.
        column: &'static str,
    },
    /// The header row could not be decoded.
    #[error("failed to read CSV header")]
    ReadHeader {
        /// Source error returned by `csv`.
        #[source]
        source: csv::Error,
    },
    /// A data row could not be decoded.
    #[error("failed to read CSV row {row}")]
    ReadRow {
        /// One-based index of the data row.
        row: usize,
        /// Source error returned by `csv`.
        #[source]
        source: csv::Error,
    },
    /// Beginning a batch transaction failed.
    #[error("failed to begin postcode import transaction")]
    BeginTransaction {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Preparing the upsert statement failed.
    #[error("failed to prepare postcode upsert statement")]
    PrepareUpsert {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Writing a postcode row failed.
    #[error("failed to persist postcode {postcode}")]
    PersistRow {
        /// Postcode being written.
        postcode: Postcode,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Committing a batch failed.
    #[error("failed to commit postcode import transaction")]
    Commit {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Import the CSV file at `path` into the `postcodes` table.
///
/// `batch_size` bounds the rows written per transaction; zero is treated as
/// one.
///
/// # Errors
/// Returns [`ImportError::MissingFile`] when `path` does not exist, and the
/// errors of [`import_postcodes_from_reader`] otherwise.
pub fn import_postcodes(
    connection: &mut Connection,
    path: &Utf8Path,
    batch_size: usize,
) -> Result<ImportSummary, ImportError> {
    let file = File::open(path.as_std_path()).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ImportError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            ImportError::OpenFile {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let summary = import_postcodes_from_reader(connection, file, batch_size)?;
    info!(
        "imported postcodes from {path}: processed={}, skipped={}, imported={}",
        summary.processed, summary.skipped, summary.imported
    );
    Ok(summary)
}

/// Import postcode rows from any CSV source.
///
/// # Errors
/// Returns [`ImportError::EmptyFile`] or [`ImportError::MissingColumn`] when
/// the header row is unusable, [`ImportError::ReadRow`] when the CSV cannot be
/// decoded, and the SQL step errors when a batch cannot be written. Batches
/// committed before a failure remain in place.
///
/// # Examples
/// ```
/// use deliveryzone_data::import_postcodes_from_reader;
/// use rusqlite::Connection;
///
/// let mut connection = Connection::open_in_memory().expect("open in-memory db");
/// deliveryzone_core::store::initialise_schema(&connection).expect("create schema");
///
/// let csv = "postcode,lat,lng\nsw1a 1aa,51.501009,-0.141588\n,51.0,0.0\n";
/// let summary = import_postcodes_from_reader(&mut connection, csv.as_bytes(), 100)
///     .expect("import succeeds");
/// assert_eq!((summary.processed, summary.skipped, summary.imported), (2, 1, 1));
/// ```
pub fn import_postcodes_from_reader<R: Read>(
    connection: &mut Connection,
    reader: R,
    batch_size: usize,
) -> Result<ImportSummary, ImportError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|source| ImportError::ReadHeader { source })?;
    let columns = Columns::locate(headers)?;

    let capacity = batch_size.max(1);
    let stamp = timestamp_now();
    let mut summary = ImportSummary::default();
    let mut batch = Vec::with_capacity(capacity);

    for result in csv_reader.records() {
        summary.processed += 1;
        let record = result.map_err(|source| ImportError::ReadRow {
            row: summary.processed,
            source,
        })?;

        let Some(parsed) = columns.parse(&record) else {
            warn!("skipping CSV row {}: {record:?}", summary.processed);
            summary.skipped += 1;
            continue;
        };
        batch.push(parsed);

        if batch.len() >= capacity {
            summary.imported += flush(connection, &batch, &stamp)?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        summary.imported += flush(connection, &batch, &stamp)?;
    }

    Ok(summary)
}

/// Positions of the required columns within the header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    postcode: usize,
    lat: usize,
    lng: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, ImportError> {
        if headers.is_empty() {
            return Err(ImportError::EmptyFile);
        }
        let position = |column: &'static str| {
            headers
                .iter()
                .position(|header| header == column)
                .ok_or(ImportError::MissingColumn { column })
        };
        Ok(Self {
            postcode: position("postcode")?,
            lat: position("lat")?,
            lng: position("lng")?,
        })
    }

    fn parse(self, record: &StringRecord) -> Option<PostcodeRecord> {
        let postcode = Postcode::new(record.get(self.postcode).unwrap_or_default());
        if postcode.is_empty() {
            return None;
        }
        let lat = record.get(self.lat)?.parse::<f64>().ok()?;
        let lng = record.get(self.lng)?.parse::<f64>().ok()?;
        let location = Coordinate::new(lat, lng).ok()?;
        Some(PostcodeRecord { postcode, location })
    }
}

fn flush(
    connection: &mut Connection,
    batch: &[PostcodeRecord],
    stamp: &str,
) -> Result<usize, ImportError> {
    let transaction = connection
        .transaction()
        .map_err(|source| ImportError::BeginTransaction { source })?;
    {
        let mut statement = transaction
            .prepare_cached(UPSERT_POSTCODE)
            .map_err(|source| ImportError::PrepareUpsert { source })?;
        for record in batch {
            statement
                .execute(params![
                    record.postcode.as_str(),
                    record.location.latitude(),
                    record.location.longitude(),
                    stamp,
                ])
                .map_err(|source| ImportError::PersistRow {
                    postcode: record.postcode.clone(),
                    source,
                })?;
        }
    }
    transaction
        .commit()
        .map_err(|source| ImportError::Commit { source })?;
    debug!("flushed {} postcode rows", batch.len());
    Ok(batch.len())
}
