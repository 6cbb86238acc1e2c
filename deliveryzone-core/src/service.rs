//! Entry points combining repositories, the postcode resolver and a clock.
//!
//! [`DeliveryService`] is what transport layers call. Every input is
//! validated or resolved before any computation starts, and failures are
//! returned as [`DeliveryError`] without retries.

use thiserror::Error;

use crate::cache::LookupCache;
use crate::eligibility::assess;
use crate::nearby::search_nearby;
use crate::{
    BackendError, Clock, Coordinate, CoordinateError, DeliveryDecision, NearbyPage, NearbyQuery,
    NewStore, Postcode, PostcodeResolver, PostcodeStore, QueryError, StoreDraft, StoreError,
    StoreId, StoreRepository,
};

/// Where a caller is, either directly or by postcode.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// Explicit coordinates.
    Coordinates(Coordinate),
    /// A raw postcode, normalised during resolution.
    Postcode(String),
}

impl Location {
    /// Build a location from optional request parameters.
    ///
    /// A postcode wins over coordinates. A postcode that normalises to nothing
    /// counts as absent, and coordinates are only used when both halves are
    /// present. Returns `Ok(None)` when neither form is complete.
    ///
    /// # Errors
    /// Returns [`CoordinateError`] when the coordinates are out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use deliveryzone_core::Location;
    ///
    /// let by_postcode = Location::from_parts(Some(51.5), Some(-0.1), Some("sw1a 1aa".into()));
    /// assert_eq!(by_postcode, Ok(Some(Location::Postcode("sw1a 1aa".into()))));
    /// assert_eq!(Location::from_parts(Some(51.5), None, None), Ok(None));
    /// ```
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
        postcode: Option<String>,
    ) -> Result<Option<Self>, CoordinateError> {
        if let Some(code) = postcode.filter(|code| !Postcode::normalize(code).is_empty()) {
            return Ok(Some(Self::Postcode(code)));
        }
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => {
                Coordinate::new(lat, lng).map(|point| Some(Self::Coordinates(point)))
            }
            _ => Ok(None),
        }
    }
}

impl From<Coordinate> for Location {
    fn from(value: Coordinate) -> Self {
        Self::Coordinates(value)
    }
}

/// Failures reported by [`DeliveryService`].
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Neither coordinates nor a postcode were given for the search origin.
    #[error("provide (lat, lng) or postcode for the search origin")]
    MissingOrigin,
    /// Neither coordinates nor a postcode were given for the destination.
    #[error("provide (lat, lng) or postcode for the delivery destination")]
    MissingDestination,
    /// The normalised postcode is not in the dataset.
    #[error("postcode {postcode} not found in dataset")]
    PostcodeNotFound {
        /// Normalised postcode that failed to resolve.
        postcode: Postcode,
    },
    /// No store has the requested identifier.
    #[error("store {id} not found")]
    StoreNotFound {
        /// Requested identifier.
        id: StoreId,
    },
    /// Radius or pagination parameters were out of bounds.
    #[error(transparent)]
    InvalidRange(#[from] QueryError),
    /// Store registration input failed validation.
    #[error(transparent)]
    InvalidStore(#[from] StoreError),
    /// A repository or cache call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Store matching over injected persistence, cache and clock.
///
/// # Examples
///
/// ```
/// use deliveryzone_core::{
///     Coordinate, DeliveryService, Location, MemoryCache, NearbyQuery, Postcode,
///     PostcodeResolver, Store, StoreId, SystemClock,
///     test_support::{MemoryPostcodeStore, MemoryStoreRepository},
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let palace = Coordinate::new(51.501_009, -0.141_588)?;
/// let stores = MemoryStoreRepository::with_stores([Store::new(
///     StoreId::new(1),
///     "Palace Pantry",
///     Postcode::new("SW1A 1AA"),
///     palace,
///     3.0,
/// )?]);
/// let postcodes = MemoryPostcodeStore::default().with_postcode("SW1A 1AA", palace);
/// let resolver = PostcodeResolver::new(postcodes, MemoryCache::new(SystemClock));
/// let service = DeliveryService::new(stores, resolver, SystemClock);
///
/// let origin = Some(Location::Postcode("sw1a 1aa".into()));
/// let page = service.search_nearby(origin, &NearbyQuery::default())?;
/// assert_eq!(page.total, 1);
///
/// let decision = service.check_delivery(StoreId::new(1), Some(palace.into()))?;
/// assert!(decision.can_deliver);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DeliveryService<R, P, K, C> {
    stores: R,
    resolver: PostcodeResolver<P, K>,
    clock: C,
}

impl<R, P, K, C> DeliveryService<R, P, K, C>
where
    R: StoreRepository,
    P: PostcodeStore,
    K: LookupCache,
    C: Clock,
{
    /// Wire a service from its collaborators.
    pub const fn new(stores: R, resolver: PostcodeResolver<P, K>, clock: C) -> Self {
        Self {
            stores,
            resolver,
            clock,
        }
    }

    /// Resolve a raw postcode to its centroid.
    ///
    /// # Errors
    /// Returns [`DeliveryError::PostcodeNotFound`] for unknown postcodes and
    /// [`DeliveryError::Backend`] when the lookup fails.
    pub fn resolve_postcode(&self, raw: &str) -> Result<Coordinate, DeliveryError> {
        let postcode = Postcode::new(raw);
        self.resolver
            .resolve_postcode(&postcode)?
            .coordinate()
            .ok_or(DeliveryError::PostcodeNotFound { postcode })
    }

    /// Rank stores around `origin`.
    ///
    /// # Errors
    /// Returns [`DeliveryError::MissingOrigin`] when `origin` is `None`,
    /// [`DeliveryError::PostcodeNotFound`] when a postcode origin does not
    /// resolve, and [`DeliveryError::Backend`] for repository failures.
    pub fn search_nearby(
        &self,
        origin: Option<Location>,
        query: &NearbyQuery,
    ) -> Result<NearbyPage, DeliveryError> {
        let point = self.locate(origin.ok_or(DeliveryError::MissingOrigin)?)?;
        Ok(search_nearby(&self.stores, point, query)?)
    }

    /// Decide whether store `id` can deliver to `destination` now.
    ///
    /// The store is looked up before the destination is examined.
    ///
    /// # Errors
    /// Returns [`DeliveryError::StoreNotFound`],
    /// [`DeliveryError::MissingDestination`],
    /// [`DeliveryError::PostcodeNotFound`] or [`DeliveryError::Backend`].
    pub fn check_delivery(
        &self,
        id: StoreId,
        destination: Option<Location>,
    ) -> Result<DeliveryDecision, DeliveryError> {
        let store = self
            .stores
            .find_by_id(id)?
            .ok_or(DeliveryError::StoreNotFound { id })?;
        let point = self.locate(destination.ok_or(DeliveryError::MissingDestination)?)?;
        Ok(assess(&store, point, self.clock.now()))
    }

    /// Validate a registration draft and fill in its location.
    ///
    /// The postcode is normalised and, when the draft carries no
    /// coordinates, resolved to its centroid.
    ///
    /// # Errors
    /// Returns [`DeliveryError::InvalidStore`] for invalid fields and
    /// [`DeliveryError::PostcodeNotFound`] when the location cannot be
    /// resolved.
    pub fn prepare_store(&self, draft: StoreDraft) -> Result<NewStore, DeliveryError> {
        let checked = draft.check()?;
        let location = match checked.location {
            Some(location) => location,
            None => self
                .resolver
                .resolve_postcode(&checked.postcode)?
                .coordinate()
                .ok_or_else(|| DeliveryError::PostcodeNotFound {
                    postcode: checked.postcode.clone(),
                })?,
        };
        Ok(checked.with_location(location))
    }

    fn locate(&self, location: Location) -> Result<Coordinate, DeliveryError> {
        match location {
            Location::Coordinates(point) => Ok(point),
            Location::Postcode(raw) => self.resolve_postcode(&raw),
        }
    }
}
