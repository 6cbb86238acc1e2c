//! Command implementations against the SQLite catalog.

use camino::Utf8Path;
use deliveryzone_core::{
    CachePolicy, Coordinate, DeliveryDecision, DeliveryService, MemoryCache, NearbyPage,
    Postcode, PostcodeResolver, SqliteCatalog, Store, StoreId, SystemClock,
};
use deliveryzone_data::{ImportSummary, import_postcodes, insert_store, open_catalog};
use log::{debug, info};
use serde::Serialize;

use crate::CliError;
use crate::config::{AddStoreConfig, CanDeliverConfig, ImportConfig, NearbyConfig, ResolveConfig};

type CatalogService<'a> =
    DeliveryService<&'a SqliteCatalog, &'a SqliteCatalog, MemoryCache<SystemClock>, SystemClock>;

fn open_read_only(database: &Utf8Path) -> Result<SqliteCatalog, CliError> {
    debug!("opening catalog {database} read-only");
    Ok(SqliteCatalog::open(database)?)
}

fn service(catalog: &SqliteCatalog, policy: CachePolicy) -> CatalogService<'_> {
    let resolver = PostcodeResolver::new(catalog, MemoryCache::new(SystemClock)).with_policy(policy);
    DeliveryService::new(catalog, resolver, SystemClock)
}

/// Counters printed after an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct ImportReport {
    pub(crate) processed: usize,
    pub(crate) skipped: usize,
    pub(crate) imported: usize,
}

impl From<ImportSummary> for ImportReport {
    fn from(summary: ImportSummary) -> Self {
        Self {
            processed: summary.processed,
            skipped: summary.skipped,
            imported: summary.imported,
        }
    }
}

/// A registered store as printed by `add-store`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StoreReport {
    pub(crate) id: StoreId,
    pub(crate) name: String,
    pub(crate) postcode: Postcode,
    pub(crate) location: Coordinate,
    pub(crate) delivery_radius_km: f64,
    pub(crate) timezone: String,
    pub(crate) opens_at: Option<String>,
    pub(crate) closes_at: Option<String>,
}

impl From<Store> for StoreReport {
    fn from(store: Store) -> Self {
        let window = store.hours.window();
        Self {
            id: store.id,
            name: store.name,
            postcode: store.postcode,
            location: store.location,
            delivery_radius_km: store.delivery_radius_km,
            timezone: store.timezone.name().to_owned(),
            opens_at: window.map(|w| w.opens_at().format("%H:%M").to_string()),
            closes_at: window.map(|w| w.closes_at().format("%H:%M").to_string()),
        }
    }
}

/// A resolved postcode as printed by `resolve`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ResolvedPostcode {
    pub(crate) postcode: Postcode,
    pub(crate) location: Coordinate,
}

pub(crate) fn import(config: &ImportConfig) -> Result<ImportReport, CliError> {
    let mut connection = open_catalog(&config.database)?;
    let summary = import_postcodes(&mut connection, &config.source, config.batch_size)?;
    Ok(summary.into())
}

pub(crate) fn add_store(config: AddStoreConfig) -> Result<StoreReport, CliError> {
    let catalog = SqliteCatalog::from_connection(open_catalog(&config.database)?);
    let new_store = service(&catalog, CachePolicy::default()).prepare_store(config.draft)?;
    let store = insert_store(catalog.connection(), &new_store)?;
    Ok(store.into())
}

pub(crate) fn resolve(config: &ResolveConfig) -> Result<ResolvedPostcode, CliError> {
    let catalog = open_read_only(&config.lookup.database)?;
    let location = service(&catalog, config.lookup.cache).resolve_postcode(&config.postcode)?;
    Ok(ResolvedPostcode {
        postcode: Postcode::new(&config.postcode),
        location,
    })
}

pub(crate) fn nearby(config: NearbyConfig) -> Result<NearbyPage, CliError> {
    let catalog = open_read_only(&config.lookup.database)?;
    let page = service(&catalog, config.lookup.cache).search_nearby(config.origin, &config.query)?;
    info!(
        "found {} stores within {} km; returning page {} with {} items",
        page.total,
        page.radius_km,
        page.page,
        page.items.len()
    );
    Ok(page)
}

pub(crate) fn can_deliver(config: CanDeliverConfig) -> Result<DeliveryDecision, CliError> {
    let catalog = open_read_only(&config.lookup.database)?;
    let decision = service(&catalog, config.lookup.cache)
        .check_delivery(config.store_id, config.destination)?;
    info!(
        "store {} can_deliver={} reason={:?}",
        decision.store_id, decision.can_deliver, decision.reason
    );
    Ok(decision)
}
