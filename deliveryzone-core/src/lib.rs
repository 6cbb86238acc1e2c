//! Core domain logic for deciding whether a store can deliver to a location.
//!
//! The crate is organised leaf-first:
//! - [`geo_math`] computes great-circle distances and bounding-box prefilters.
//! - [`postcode`] normalises postcodes and resolves them to coordinates
//!   through a [`LookupCache`] in front of a [`PostcodeStore`].
//! - [`hours`] decides whether a store is open at an instant, including
//!   windows that span midnight.
//! - [`nearby`] ranks stores around a point and paginates the result.
//! - [`eligibility`] combines distance and opening hours into a
//!   [`DeliveryDecision`].
//! - [`service`] wires the pieces to injected repositories, cache and clock.
//!
//! Persistence is abstracted behind the read-only [`StoreRepository`] and
//! [`PostcodeStore`] traits. The `store-sqlite` feature provides
//! [`SqliteCatalog`], which implements both against a `SQLite` database.
//!
//! # Examples
//!
//! ```
//! use deliveryzone_core::{Coordinate, geo_math::distance_km};
//!
//! # fn main() -> Result<(), deliveryzone_core::CoordinateError> {
//! let palace = Coordinate::new(51.501_009, -0.141_588)?;
//! let barbican = Coordinate::new(51.520_180, -0.097_790)?;
//! let km = distance_km(palace, barbican);
//! assert!(km > 2.0 && km < 6.0);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cache;
pub mod clock;
mod coordinate;
pub mod eligibility;
mod error;
pub mod geo_math;
pub mod hours;
pub mod nearby;
pub mod postcode;
pub mod service;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use cache::{CachePolicy, LookupCache, MemoryCache};
pub use clock::{Clock, SystemClock};
pub use coordinate::{Coordinate, CoordinateError};
pub use eligibility::{DeclineReason, DeliveryDecision};
pub use error::BackendError;
pub use hours::{OpeningHours, OpeningWindow};
pub use nearby::{NearbyPage, NearbyQuery, NearbyStore, QueryError};
pub use postcode::{Postcode, PostcodeLookup, PostcodeRecord, PostcodeResolver, PostcodeStore};
pub use service::{DeliveryError, DeliveryService, Location};
pub use store::{NewStore, Store, StoreDraft, StoreError, StoreId, StoreRepository};

#[cfg(feature = "store-sqlite")]
pub use store::{SqliteCatalog, SqliteCatalogError};
