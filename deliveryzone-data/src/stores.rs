//! Persistence of newly registered stores.

use deliveryzone_core::{NewStore, Store, StoreId};
use log::info;
use rusqlite::{Connection, Error as SqliteError, params};
use thiserror::Error;

use crate::schema::timestamp_now;

const INSERT_STORE: &str = "INSERT INTO stores (
         name, postcode, lat, lng, delivery_radius_km, timezone,
         opens_at, closes_at, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)";

const TIME_FORMAT: &str = "%H:%M:%S";

/// Errors raised when persisting a store.
#[derive(Debug, Error)]
pub enum PersistStoreError {
    /// Writing the store row failed.
    #[error("failed to persist store {name:?}")]
    PersistRow {
        /// Name of the store being written.
        name: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// `SQLite` assigned a row id that cannot be a [`StoreId`].
    #[error("store row id {row_id} is negative")]
    RowIdOutOfRange {
        /// Row id returned by `SQLite`.
        row_id: i64,
    },
}

/// Insert `store` and return it with its assigned identifier.
///
/// Opening hours are written as `HH:MM:SS`; always-open stores leave both
/// columns `NULL`.
///
/// # Errors
/// Returns [`PersistStoreError::PersistRow`] when the insert fails.
pub fn insert_store(connection: &Connection, store: &NewStore) -> Result<Store, PersistStoreError> {
    let window = store.hours.window();
    let opens_at = window.map(|w| w.opens_at().format(TIME_FORMAT).to_string());
    let closes_at = window.map(|w| w.closes_at().format(TIME_FORMAT).to_string());

    connection
        .execute(
            INSERT_STORE,
            params![
                store.name,
                store.postcode.as_str(),
                store.location.latitude(),
                store.location.longitude(),
                store.delivery_radius_km,
                store.timezone.name(),
                opens_at,
                closes_at,
                timestamp_now(),
            ],
        )
        .map_err(|source| PersistStoreError::PersistRow {
            name: store.name.clone(),
            source,
        })?;

    let row_id = connection.last_insert_rowid();
    let id = u64::try_from(row_id).map_err(|_| PersistStoreError::RowIdOutOfRange { row_id })?;
    let persisted = store.clone().into_store(StoreId::new(id));
    info!(
        "registered store {} ({}) at {}",
        persisted.id, persisted.name, persisted.postcode
    );
    Ok(persisted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use chrono_tz::Europe::London;
    use deliveryzone_core::{
        Coordinate, OpeningHours, Postcode, StoreRepository, SqliteCatalog,
        store::initialise_schema,
    };
    use rstest::{fixture, rstest};

    #[fixture]
    fn connection() -> Connection {
        let connection = Connection::open_in_memory().expect("open in-memory db");
        initialise_schema(&connection).expect("create schema");
        connection
    }

    fn new_store(name: &str, hours: OpeningHours) -> NewStore {
        NewStore {
            name: name.to_owned(),
            postcode: Postcode::new("sw1a 1aa"),
            location: Coordinate::new(51.501_009, -0.141_588).expect("valid coordinate"),
            delivery_radius_km: 2.5,
            timezone: London,
            hours,
        }
    }

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
    }

    #[rstest]
    fn assigns_sequential_ids(connection: Connection) {
        let first = insert_store(&connection, &new_store("Palace", OpeningHours::AlwaysOpen))
            .expect("insert first");
        let second = insert_store(&connection, &new_store("Barbican", OpeningHours::AlwaysOpen))
            .expect("insert second");

        assert_eq!(first.id, StoreId::new(1));
        assert_eq!(second.id, StoreId::new(2));
    }

    #[rstest]
    fn persisted_store_reads_back_through_catalog(connection: Connection) {
        let hours = OpeningHours::from_bounds(Some(time(22, 0)), Some(time(2, 0)));
        let inserted =
            insert_store(&connection, &new_store("Late Night", hours)).expect("insert store");

        let catalog = SqliteCatalog::from_connection(connection);
        let found = catalog
            .find_by_id(inserted.id)
            .expect("lookup succeeds")
            .expect("store exists");
        assert_eq!(found, inserted);
    }

    #[rstest]
    fn always_open_leaves_hours_null(connection: Connection) {
        insert_store(&connection, &new_store("Palace", OpeningHours::AlwaysOpen))
            .expect("insert store");
        let (opens, closes): (Option<String>, Option<String>) = connection
            .query_row("SELECT opens_at, closes_at FROM stores", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .expect("select hours");
        assert_eq!((opens, closes), (None, None));
    }
}
