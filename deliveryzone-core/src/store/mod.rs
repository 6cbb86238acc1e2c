//! Store model and read-only repository access.
//!
//! The [`StoreRepository`] trait is the seam between the matching logic and
//! persistence. Candidates are fetched with a geographic bounding box using
//! WGS84 coordinates (`x = longitude`, `y = latitude`).

use chrono_tz::Tz;
use geo::Rect;
use thiserror::Error;

use crate::hours::parse_time_of_day;
use crate::{BackendError, Coordinate, OpeningHours, Postcode};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::{CATALOG_SCHEMA, SqliteCatalog, SqliteCatalogError, initialise_schema};

/// Timezone assumed when a store does not name one.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::London;

/// Delivery radius assigned to newly registered stores without one.
pub const DEFAULT_DELIVERY_RADIUS_KM: f64 = 5.0;

/// Smallest delivery radius accepted at registration.
pub const MIN_DRAFT_RADIUS_KM: f64 = 0.1;

/// Largest delivery radius accepted at registration.
pub const MAX_DRAFT_RADIUS_KM: f64 = 100.0;

const MAX_NAME_CHARS: usize = 255;
const MAX_POSTCODE_CHARS: usize = 16;

/// Identifier of a persisted store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(transparent))]
pub struct StoreId(u64);

impl StoreId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for StoreId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised while validating store data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The delivery radius was zero, negative or not finite.
    #[error("delivery radius must be a positive number of kilometres, got {radius_km}")]
    NonPositiveRadius {
        /// Rejected radius.
        radius_km: f64,
    },
    /// A registration radius fell outside the accepted range.
    #[error("delivery radius {radius_km} km is outside [0.1, 100]")]
    RadiusOutOfRange {
        /// Rejected radius.
        radius_km: f64,
    },
    /// The store name was blank.
    #[error("store name must not be empty")]
    EmptyName,
    /// The store name exceeded 255 characters.
    #[error("store name has {chars} characters; the limit is 255")]
    NameTooLong {
        /// Length of the rejected name.
        chars: usize,
    },
    /// The postcode was blank once normalised.
    #[error("store postcode must not be empty")]
    EmptyPostcode,
    /// The postcode exceeded 16 characters.
    #[error("postcode has {chars} characters; the limit is 16")]
    PostcodeTooLong {
        /// Length of the rejected postcode.
        chars: usize,
    },
    /// The timezone is not a known IANA name.
    #[error("unknown timezone {name:?}")]
    UnknownTimezone {
        /// Rejected timezone name.
        name: String,
    },
    /// An opening or closing time was not `HH:MM`.
    #[error("{field} must be HH:MM, got {value:?}")]
    InvalidTime {
        /// Which bound failed to parse.
        field: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// A store that delivers within a radius of its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    /// Unique identifier.
    pub id: StoreId,
    /// Display name.
    pub name: String,
    /// Normalised postcode of the premises.
    pub postcode: Postcode,
    /// Location deliveries are measured from.
    pub location: Coordinate,
    /// Maximum delivery distance, in kilometres.
    pub delivery_radius_km: f64,
    /// IANA timezone the opening hours are expressed in.
    pub timezone: Tz,
    /// When the store accepts orders.
    pub hours: OpeningHours,
}

impl Store {
    /// Validates and constructs an always-open [`Store`] in the default
    /// timezone.
    ///
    /// # Errors
    /// Returns [`StoreError::NonPositiveRadius`] unless the radius is a
    /// finite, strictly positive number.
    pub fn new(
        id: StoreId,
        name: impl Into<String>,
        postcode: Postcode,
        location: Coordinate,
        delivery_radius_km: f64,
    ) -> Result<Self, StoreError> {
        if !(delivery_radius_km.is_finite() && delivery_radius_km > 0.0) {
            return Err(StoreError::NonPositiveRadius {
                radius_km: delivery_radius_km,
            });
        }
        Ok(Self {
            id,
            name: name.into(),
            postcode,
            location,
            delivery_radius_km,
            timezone: DEFAULT_TIMEZONE,
            hours: OpeningHours::AlwaysOpen,
        })
    }

    /// Replace the timezone.
    #[must_use]
    pub const fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Replace the opening hours.
    #[must_use]
    pub const fn with_hours(mut self, hours: OpeningHours) -> Self {
        self.hours = hours;
        self
    }
}

/// Parse an IANA timezone name.
///
/// # Errors
/// Returns [`StoreError::UnknownTimezone`] for names missing from the tz
/// database.
pub fn parse_timezone(name: &str) -> Result<Tz, StoreError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| StoreError::UnknownTimezone {
            name: name.to_owned(),
        })
}

/// Read-only access to persisted stores.
///
/// # Examples
///
/// ```rust
/// use geo::{Coord, Rect};
/// use deliveryzone_core::{
///     Coordinate, Postcode, Store, StoreId, StoreRepository,
///     test_support::MemoryStoreRepository,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let location = Coordinate::new(51.5, -0.1)?;
/// let store = Store::new(StoreId::new(1), "Corner", Postcode::new("SE1 9SG"), location, 3.0)?;
/// let repository = MemoryStoreRepository::with_stores([store.clone()]);
///
/// let bbox = Rect::new(Coord { x: -0.2, y: 51.4 }, Coord { x: 0.0, y: 51.6 });
/// assert_eq!(repository.find_in_bbox(&bbox)?, vec![store]);
/// # Ok(())
/// # }
/// ```
pub trait StoreRepository {
    /// Return every store whose location lies inside `bbox`, boundary
    /// included.
    ///
    /// The rectangle is axis-aligned in lon/lat space and is not split at the
    /// antimeridian.
    ///
    /// # Errors
    /// Returns [`BackendError`] when the repository cannot be read.
    fn find_in_bbox(&self, bbox: &Rect<f64>) -> Result<Vec<Store>, BackendError>;

    /// Return the store with identifier `id`, if it exists.
    ///
    /// # Errors
    /// Returns [`BackendError`] when the repository cannot be read.
    fn find_by_id(&self, id: StoreId) -> Result<Option<Store>, BackendError>;
}

impl<T: StoreRepository + ?Sized> StoreRepository for &T {
    fn find_in_bbox(&self, bbox: &Rect<f64>) -> Result<Vec<Store>, BackendError> {
        (**self).find_in_bbox(bbox)
    }

    fn find_by_id(&self, id: StoreId) -> Result<Option<Store>, BackendError> {
        (**self).find_by_id(id)
    }
}

/// Unvalidated input for registering a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreDraft {
    /// Display name.
    pub name: String,
    /// Postcode as entered; normalised during validation.
    pub postcode: String,
    /// Explicit location; resolved from the postcode when absent.
    pub location: Option<Coordinate>,
    /// Delivery radius in kilometres; defaults to 5.
    pub delivery_radius_km: Option<f64>,
    /// IANA timezone name; defaults to `Europe/London`.
    pub timezone: Option<String>,
    /// Opening time, `HH:MM`.
    pub opens_at: Option<String>,
    /// Closing time, `HH:MM`.
    pub closes_at: Option<String>,
}

/// A validated store ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStore {
    /// Display name.
    pub name: String,
    /// Normalised postcode.
    pub postcode: Postcode,
    /// Location deliveries are measured from.
    pub location: Coordinate,
    /// Delivery radius in kilometres.
    pub delivery_radius_km: f64,
    /// IANA timezone.
    pub timezone: Tz,
    /// Opening hours.
    pub hours: OpeningHours,
}

impl NewStore {
    /// Attach the identifier assigned by persistence.
    #[must_use]
    pub fn into_store(self, id: StoreId) -> Store {
        Store {
            id,
            name: self.name,
            postcode: self.postcode,
            location: self.location,
            delivery_radius_km: self.delivery_radius_km,
            timezone: self.timezone,
            hours: self.hours,
        }
    }
}

/// Draft fields that do not depend on a location.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CheckedDraft {
    pub(crate) name: String,
    pub(crate) postcode: Postcode,
    pub(crate) location: Option<Coordinate>,
    pub(crate) delivery_radius_km: f64,
    pub(crate) timezone: Tz,
    pub(crate) hours: OpeningHours,
}

impl CheckedDraft {
    pub(crate) fn with_location(self, location: Coordinate) -> NewStore {
        NewStore {
            name: self.name,
            postcode: self.postcode,
            location,
            delivery_radius_km: self.delivery_radius_km,
            timezone: self.timezone,
            hours: self.hours,
        }
    }
}

impl StoreDraft {
    /// Validate every field except the location and apply defaults.
    pub(crate) fn check(self) -> Result<CheckedDraft, StoreError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let name_chars = name.chars().count();
        if name_chars > MAX_NAME_CHARS {
            return Err(StoreError::NameTooLong { chars: name_chars });
        }

        let postcode = Postcode::new(&self.postcode);
        if postcode.is_empty() {
            return Err(StoreError::EmptyPostcode);
        }
        let postcode_chars = postcode.as_str().chars().count();
        if postcode_chars > MAX_POSTCODE_CHARS {
            return Err(StoreError::PostcodeTooLong {
                chars: postcode_chars,
            });
        }

        let delivery_radius_km = self
            .delivery_radius_km
            .unwrap_or(DEFAULT_DELIVERY_RADIUS_KM);
        if !(MIN_DRAFT_RADIUS_KM..=MAX_DRAFT_RADIUS_KM).contains(&delivery_radius_km) {
            return Err(StoreError::RadiusOutOfRange {
                radius_km: delivery_radius_km,
            });
        }

        let timezone = self
            .timezone
            .as_deref()
            .map_or(Ok(DEFAULT_TIMEZONE), parse_timezone)?;
        let opens_at = parse_bound("opens_at", self.opens_at.as_deref())?;
        let closes_at = parse_bound("closes_at", self.closes_at.as_deref())?;

        Ok(CheckedDraft {
            name,
            postcode,
            location: self.location,
            delivery_radius_km,
            timezone,
            hours: OpeningHours::from_bounds(opens_at, closes_at),
        })
    }
}

fn parse_bound(
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
