//! Facade crate for delivery-zone store matching.
//!
//! This crate re-exports the core domain types and exposes the SQLite catalog
//! behind the `store-sqlite` feature.

#![forbid(unsafe_code)]

pub use deliveryzone_core::{
    CachePolicy, Clock, Coordinate, CoordinateError, DeclineReason, DeliveryDecision,
    DeliveryError, DeliveryService, Location, LookupCache, MemoryCache, NearbyPage, NearbyQuery,
    NearbyStore, OpeningHours, OpeningWindow, Postcode, PostcodeLookup, PostcodeResolver,
    PostcodeStore, QueryError, Store, StoreDraft, StoreId, StoreRepository, SystemClock,
};

#[cfg(feature = "store-sqlite")]
pub use deliveryzone_core::{SqliteCatalog, SqliteCatalogError};
