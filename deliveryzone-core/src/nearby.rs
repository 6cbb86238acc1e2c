//! Proximity search over a [`StoreRepository`].
//!
//! Candidates are fetched with the [`bounding_box`] prefilter, re-checked
//! with the exact great-circle distance, ranked nearest first and paginated.

use thiserror::Error;

use crate::geo_math::{bounding_box, distance_km};
use crate::{BackendError, Coordinate, Postcode, Store, StoreId, StoreRepository};

/// Radius used when the caller does not supply one.
pub const DEFAULT_RADIUS_KM: f64 = 5.0;
/// Largest accepted search radius.
pub const MAX_RADIUS_KM: f64 = 200.0;
/// Page returned when the caller does not supply one.
pub const DEFAULT_PAGE: u32 = 1;
/// Page size used when the caller does not supply one.
pub const DEFAULT_PER_PAGE: u32 = 20;
/// Largest accepted page size.
pub const MAX_PER_PAGE: u32 = 100;

/// Search parameters outside their documented bounds.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum QueryError {
    /// Radius was not in `(0, 200]`.
    #[error("radius {0} km is outside (0, 200]")]
    RadiusOutOfRange(f64),
    /// Page was zero.
    #[error("page must be at least 1, got {0}")]
    PageOutOfRange(u32),
    /// Page size was not in `1..=100`.
    #[error("per_page {0} is outside 1..=100")]
    PerPageOutOfRange(u32),
}

/// Validated radius and pagination for a nearby search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    radius_km: f64,
    page: u32,
    per_page: u32,
}

impl Default for NearbyQuery {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_RADIUS_KM,
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl NearbyQuery {
    /// Apply defaults to missing parameters and validate the result.
    ///
    /// # Errors
    /// Returns [`QueryError`] when a parameter is out of range. NaN radii are
    /// rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use deliveryzone_core::{NearbyQuery, QueryError};
    ///
    /// let query = NearbyQuery::new(None, Some(2), None).expect("defaults are valid");
    /// assert_eq!(query.radius_km(), 5.0);
    /// assert_eq!(query.page(), 2);
    /// assert_eq!(query.per_page(), 20);
    ///
    /// assert_eq!(
    ///     NearbyQuery::new(Some(250.0), None, None),
    ///     Err(QueryError::RadiusOutOfRange(250.0))
    /// );
    /// ```
    pub fn new(
        radius_km: Option<f64>,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<Self, QueryError> {
        let radius = radius_km.unwrap_or(DEFAULT_RADIUS_KM);
        if !(radius > 0.0 && radius <= MAX_RADIUS_KM) {
            return Err(QueryError::RadiusOutOfRange(radius));
        }
        let page_number = page.unwrap_or(DEFAULT_PAGE);
        if page_number == 0 {
            return Err(QueryError::PageOutOfRange(page_number));
        }
        let page_size = per_page.unwrap_or(DEFAULT_PER_PAGE);
        if !(1..=MAX_PER_PAGE).contains(&page_size) {
            return Err(QueryError::PerPageOutOfRange(page_size));
        }
        Ok(Self {
            radius_km: radius,
            page: page_number,
            per_page: page_size,
        })
    }

    /// Search radius in kilometres.
    #[must_use]
    pub const fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Maximum items per page.
    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    fn offset(&self) -> usize {
        let skipped_pages = usize::try_from(self.page.saturating_sub(1)).unwrap_or(usize::MAX);
        skipped_pages.saturating_mul(self.limit())
    }

    fn limit(&self) -> usize {
        usize::try_from(self.per_page).unwrap_or(usize::MAX)
    }
}

/// A store within the search radius and its distance from the origin.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NearbyStore {
    /// Store identifier.
    pub id: StoreId,
    /// Display name.
    pub name: String,
    /// Store postcode.
    pub postcode: Postcode,
    /// Store location.
    pub location: Coordinate,
    /// The store's own delivery radius.
    pub delivery_radius_km: f64,
    /// Great-circle distance from the search origin.
    pub distance_km: f64,
}

impl NearbyStore {
    fn from_store(store: Store, distance_km: f64) -> Self {
        Self {
            id: store.id,
            name: store.name,
            postcode: store.postcode,
            location: store.location,
            delivery_radius_km: store.delivery_radius_km,
            distance_km,
        }
    }
}

/// One page of nearby stores.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NearbyPage {
    /// Stores on this page, nearest first.
    pub items: Vec<NearbyStore>,
    /// Matches across all pages.
    pub total: usize,
    /// Echoed page number.
    pub page: u32,
    /// Echoed page size.
    pub per_page: u32,
    /// Echoed search radius.
    pub radius_km: f64,
}

/// Rank the stores within `query.radius_km()` of `origin`.
///
/// Ties keep the order the repository returned them in. A page past the last
/// match is empty while `total` still counts every match.
///
/// # Errors
/// Propagates [`BackendError`] from the repository.
///
/// # Examples
///
/// ```
/// use deliveryzone_core::{
///     Coordinate, NearbyQuery, Postcode, Store, StoreId, nearby::search_nearby,
///     test_support::MemoryStoreRepository,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let origin = Coordinate::new(51.501_009, -0.141_588)?;
/// let store = Store::new(StoreId::new(1), "Palace", Postcode::new("SW1A 1AA"), origin, 2.0)?;
/// let repository = MemoryStoreRepository::with_stores([store]);
///
/// let page = search_nearby(&repository, origin, &NearbyQuery::default())?;
/// assert_eq!(page.total, 1);
/// assert_eq!(page.items[0].distance_km, 0.0);
/// # Ok(())
/// # }
/// ```
pub fn search_nearby<R>(
    repository: &R,
    origin: Coordinate,
    query: &NearbyQuery,
) -> Result<NearbyPage, BackendError>
where
    R: StoreRepository + ?Sized,
{
    let radius_km = query.radius_km();
    let candidates = repository.find_in_bbox(&bounding_box(origin, radius_km))?;

    let mut matches: Vec<NearbyStore> = candidates
        .into_iter()
        .filter_map(|store| {
            let distance = distance_km(origin, store.location);
            (distance <= radius_km).then(|| NearbyStore::from_store(store, distance))
        })
        .collect();
    matches.sort_by(|left, right| left.distance_km.total_cmp(&right.distance_km));

    let total = matches.len();
    let items = matches
        .into_iter()
        .skip(query.offset())
        .take(query.limit())
        .collect();

    Ok(NearbyPage {
        items,
        total,
        page: query.page(),
        per_page: query.per_page(),
        radius_km,
    })
}
