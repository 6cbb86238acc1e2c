//! Behavioural tests for `SqliteCatalog` using rstest-bdd.
#![cfg(feature = "store-sqlite")]

use std::{cell::RefCell, path::PathBuf};

use geo::{Coord, Rect};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use deliveryzone_core::{
    Coordinate, DeclineReason, DeliveryDecision, DeliveryService, Location, MemoryCache, Postcode,
    PostcodeRecord, PostcodeResolver, SqliteCatalog, SqliteCatalogError, Store, StoreId,
    StoreRepository, SystemClock,
    test_support::{sample_store, write_sqlite_catalog},
};

/// Shared state for SQLite catalog scenarios.
#[derive(Debug)]
struct CatalogWorld {
    temp_dir: TempDir,
    path: RefCell<Option<PathBuf>>,
    open_error: RefCell<Option<SqliteCatalogError>>,
    stores: RefCell<Vec<Store>>,
    decision: RefCell<Option<DeliveryDecision>>,
}

impl CatalogWorld {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
            path: RefCell::new(None),
            open_error: RefCell::new(None),
            stores: RefCell::new(Vec::new()),
            decision: RefCell::new(None),
        }
    }

    fn expect_path(&self) -> PathBuf {
        self.path
            .borrow()
            .as_ref()
            .cloned()
            .expect("path should be initialised before opening the catalog")
    }

    fn open_catalog(&self) -> SqliteCatalog {
        SqliteCatalog::open(self.expect_path()).expect("open catalog")
    }
}

#[fixture]
fn world() -> CatalogWorld {
    CatalogWorld::new()
}

#[given("a SQLite catalog with stores in London and Manchester")]
fn given_catalog(world: &CatalogWorld) {
    let path = world.temp_dir.path().join("catalog.db");
    let stores = vec![
        sample_store(1, 51.501_009, -0.141_588, 1.0),
        sample_store(2, 53.479_251, -2.247_926, 5.0),
    ];
    let barbican = PostcodeRecord {
        postcode: Postcode::new("EC2Y 8DS"),
        location: Coordinate::new(51.520_180, -0.097_790).expect("valid coordinate"),
    };
    write_sqlite_catalog(&path, &stores, &[barbican]).expect("persist catalog");
    world.path.replace(Some(path));
}

#[given("a path with no SQLite database")]
fn given_missing_database(world: &CatalogWorld) {
    world
        .path
        .replace(Some(world.temp_dir.path().join("absent.db")));
}

#[when("I query a bounding box around London")]
fn when_query_london(world: &CatalogWorld) {
    let catalog = world.open_catalog();
    let bbox = Rect::new(Coord { x: -0.5, y: 51.3 }, Coord { x: 0.2, y: 51.7 });
    let stores = catalog.find_in_bbox(&bbox).expect("query succeeds");
    world.stores.replace(stores);
}

#[when("I check delivery from the London store to postcode EC2Y 8DS")]
fn when_check_delivery(world: &CatalogWorld) {
    let catalog = world.open_catalog();
    let resolver = PostcodeResolver::new(&catalog, MemoryCache::new(SystemClock));
    let service = DeliveryService::new(&catalog, resolver, SystemClock);
    let decision = service
        .check_delivery(StoreId::new(1), Some(Location::Postcode("ec2y 8ds".into())))
        .expect("decision");
    world.decision.replace(Some(decision));
}

#[when("I open the SQLite catalog")]
fn when_open_catalog(world: &CatalogWorld) {
    if let Err(err) = SqliteCatalog::open(world.expect_path()) {
        world.open_error.replace(Some(err));
    }
}

#[then("only the London store is returned from the catalog")]
fn then_only_london(world: &CatalogWorld) {
    let ids: Vec<_> = world.stores.borrow().iter().map(|store| store.id.get()).collect();
    assert_eq!(ids, vec![1]);
}

#[then("the catalog-backed decision is out of range")]
fn then_out_of_range(world: &CatalogWorld) {
    let binding = world.decision.borrow();
    let decision = binding.as_ref().expect("a decision should be recorded");
    assert!(!decision.can_deliver);
    assert_eq!(decision.reason, Some(DeclineReason::OutOfRange));
}

#[then("opening the catalog fails with an open database error")]
fn then_open_error(world: &CatalogWorld) {
    let binding = world.open_error.borrow();
    let error = binding.as_ref().expect("an error should be recorded");
    assert!(matches!(error, SqliteCatalogError::OpenDatabase { .. }));
}

#[scenario(path = "tests/features/sqlite_catalog.feature", index = 0)]
fn stores_in_bbox(world: CatalogWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/sqlite_catalog.feature", index = 1)]
fn delivery_against_catalog(world: CatalogWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/sqlite_catalog.feature", index = 2)]
fn missing_database(world: CatalogWorld) {
    let _ = world;
}
