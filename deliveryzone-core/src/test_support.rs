//! In-memory collaborators and fixtures used by unit and behaviour tests.
//!
//! Everything here favours determinism over performance: repositories scan
//! linearly and [`ManualClock`] only moves when told to.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use geo::{Coord, Intersects, Rect};

use crate::{
    BackendError, Clock, Coordinate, Postcode, PostcodeStore, Store, StoreId, StoreRepository,
};

/// In-memory `StoreRepository` implementation used in tests.
///
/// The repository performs a linear scan and returns stores in insertion
/// order.
#[derive(Default, Debug, Clone)]
pub struct MemoryStoreRepository {
    stores: Vec<Store>,
}

impl MemoryStoreRepository {
    /// Create a repository from a collection of stores.
    #[must_use]
    pub fn with_stores<I>(stores: I) -> Self
    where
        I: IntoIterator<Item = Store>,
    {
        Self {
            stores: stores.into_iter().collect(),
        }
    }

    /// Add one more store.
    pub fn insert(&mut self, store: Store) {
        self.stores.push(store);
    }
}

impl StoreRepository for MemoryStoreRepository {
    fn find_in_bbox(&self, bbox: &Rect<f64>) -> Result<Vec<Store>, BackendError> {
        Ok(self
            .stores
            .iter()
            // `Intersects` treats boundary points as inside the rectangle.
            .filter(|store| bbox.intersects(&Coord::from(store.location)))
            .cloned()
            .collect())
    }

    fn find_by_id(&self, id: StoreId) -> Result<Option<Store>, BackendError> {
        Ok(self.stores.iter().find(|store| store.id == id).cloned())
    }
}

/// `StoreRepository` whose every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStoreRepository;

impl StoreRepository for FailingStoreRepository {
    fn find_in_bbox(&self, _bbox: &Rect<f64>) -> Result<Vec<Store>, BackendError> {
        Err(BackendError::new(
            "store bounding-box query",
            "store repository unavailable",
        ))
    }

    fn find_by_id(&self, _id: StoreId) -> Result<Option<Store>, BackendError> {
        Err(BackendError::new("store lookup", "store repository unavailable"))
    }
}

/// In-memory `PostcodeStore` that counts backend reads.
#[derive(Debug, Default)]
pub struct MemoryPostcodeStore {
    entries: HashMap<Postcode, Coordinate>,
    lookups: AtomicUsize,
}

impl MemoryPostcodeStore {
    /// Add a postcode; `raw` is normalised first.
    #[must_use]
    pub fn with_postcode(mut self, raw: &str, location: Coordinate) -> Self {
        self.entries.insert(Postcode::new(raw), location);
        self
    }

    /// Number of `find_by_normalized_code` calls served so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl PostcodeStore for MemoryPostcodeStore {
    fn find_by_normalized_code(
        &self,
        postcode: &Postcode,
    ) -> Result<Option<Coordinate>, BackendError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.get(postcode).copied())
    }
}

/// `PostcodeStore` whose every lookup fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingPostcodeStore;

impl PostcodeStore for FailingPostcodeStore {
    fn find_by_normalized_code(
        &self,
        _postcode: &Postcode,
    ) -> Result<Option<Coordinate>, BackendError> {
        Err(BackendError::new("postcode lookup", "postcode store unavailable"))
    }
}

/// Clock that only advances when told to. Clones share the same instant.
///
/// Starts at the Unix epoch.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock reading `instant`.
    #[must_use]
    pub fn at(instant: DateTime<Utc>) -> Self {
        let clock = Self::default();
        clock.set(instant);
        clock
    }

    /// Jump to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.millis
            .store(instant.timestamp_millis(), Ordering::SeqCst);
    }

    /// Move forward by `by`, saturating at the largest representable instant.
    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        let next = self.millis.load(Ordering::SeqCst).saturating_add(delta);
        self.millis.store(next, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Always-open store in London time with a placeholder postcode.
///
/// # Panics
/// Panics when the coordinate or radius is invalid.
#[must_use]
#[expect(clippy::expect_used, reason = "fixtures should fail fast during setup")]
pub fn sample_store(id: u64, latitude: f64, longitude: f64, radius_km: f64) -> Store {
    let location = Coordinate::new(latitude, longitude).expect("fixture coordinate is valid");
    Store::new(
        StoreId::new(id),
        format!("Store {id}"),
        Postcode::new("SW1A 1AA"),
        location,
        radius_km,
    )
    .expect("fixture store is valid")
}

#[cfg(feature = "store-sqlite")]
pub use sqlite_support::write_sqlite_catalog;

#[cfg(feature = "store-sqlite")]
mod sqlite_support {
    use std::path::Path;

    use rusqlite::{Connection, params};

    use crate::store::initialise_schema;
    use crate::{PostcodeRecord, Store};

    const TIME_FORMAT: &str = "%H:%M:%S";
    const FIXTURE_TIMESTAMP: &str = "2026-01-01T00:00:00Z";

    /// Create a catalog at `path` holding `stores` and `postcodes`.
    ///
    /// Store identifiers are written as given.
    ///
    /// # Errors
    /// Returns the underlying `rusqlite` error if the database cannot be
    /// written.
    pub fn write_sqlite_catalog(
        path: &Path,
        stores: &[Store],
        postcodes: &[PostcodeRecord],
    ) -> rusqlite::Result<()> {
        let mut connection = Connection::open(path)?;
        initialise_schema(&connection)?;
        let tx = connection.transaction()?;
        {
            let mut insert_store = tx.prepare(
                "INSERT INTO stores (id, name, postcode, lat, lng, delivery_radius_km, \
                 timezone, opens_at, closes_at, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            )?;
            for store in stores {
                let window = store.hours.window();
                let opens_at = window.map(|w| w.opens_at().format(TIME_FORMAT).to_string());
                let closes_at = window.map(|w| w.closes_at().format(TIME_FORMAT).to_string());
                insert_store.execute(params![
                    store.id.get(),
                    store.name,
                    store.postcode.as_str(),
                    store.location.latitude(),
                    store.location.longitude(),
                    store.delivery_radius_km,
                    store.timezone.name(),
                    opens_at,
                    closes_at,
                    FIXTURE_TIMESTAMP,
                ])?;
            }

            let mut insert_postcode = tx.prepare(
                "INSERT INTO postcodes (postcode, lat, lng, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?4)",
            )?;
            for record in postcodes {
                insert_postcode.execute(params![
                    record.postcode.as_str(),
                    record.location.latitude(),
                    record.location.longitude(),
                    FIXTURE_TIMESTAMP,
                ])?;
            }
        }
        tx.commit()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    fn clones_share_the_manual_instant() {
        let clock = ManualClock::default();
        let shared = clock.clone();
        clock.advance(Duration::from_secs(90));
        assert_eq!(shared.now().timestamp(), 90);
    }

    #[rstest]
    fn manual_clock_can_be_pinned() {
        let instant = Utc
            .with_ymd_and_hms(2026, 3, 1, 8, 30, 0)
            .single()
            .expect("valid instant");
        assert_eq!(ManualClock::at(instant).now(), instant);
    }

    #[rstest]
    fn memory_repository_includes_boundary_points() {
        let repository = MemoryStoreRepository::with_stores([sample_store(1, 1.0, 1.0, 1.0)]);
        let bbox = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        let found = repository.find_in_bbox(&bbox).expect("scan succeeds");
        assert_eq!(found.len(), 1);
    }
}
