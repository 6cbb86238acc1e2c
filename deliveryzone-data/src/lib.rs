//! Persistence and ingestion for the delivery-zone catalog.
//!
//! Responsibilities:
//! - Create the SQLite catalog and its parent directories.
//! - Import postcode centroids from CSV in batched upserts.
//! - Persist validated stores produced by the core service.
//!
//! Boundaries:
//! - Do not encode matching rules (live in `deliveryzone-core`).
//! - Reading the catalog belongs to `deliveryzone_core::SqliteCatalog`.
//!
//! Invariants:
//! - Postcodes are stored normalised and unique.
//! - No global mutable state.

#![forbid(unsafe_code)]

pub mod import;
pub mod schema;
pub mod stores;

pub use import::{
    DEFAULT_BATCH_SIZE, ImportError, ImportSummary, import_postcodes, import_postcodes_from_reader,
};
pub use schema::{SchemaError, open_catalog};
pub use stores::{PersistStoreError, insert_store};
