//! Layered arguments for each subcommand and the configs resolved from them.
//!
//! Every argument struct derives `OrthoConfig`, so each field may come from a
//! CLI flag, a `DELIVERYZONE_CMDS_<COMMAND>_<FIELD>` environment variable or
//! the `[cmds.<command>]` table of a config file. The clap `name` of each
//! struct selects that namespace.
//! Merged arguments are converted into validated configs with `TryFrom`.

use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use deliveryzone_core::{CachePolicy, Coordinate, Location, NearbyQuery, StoreDraft, StoreId};
use deliveryzone_data::DEFAULT_BATCH_SIZE;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::CliError;

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_SOURCE: &str = "source";
pub(crate) const ARG_BATCH: &str = "batch";
pub(crate) const ARG_NAME: &str = "name";
pub(crate) const ARG_POSTCODE: &str = "postcode";
pub(crate) const ARG_LAT: &str = "lat";
pub(crate) const ARG_LNG: &str = "lng";
pub(crate) const ARG_RADIUS_KM: &str = "radius-km";
pub(crate) const ARG_TIMEZONE: &str = "timezone";
pub(crate) const ARG_OPENS_AT: &str = "opens-at";
pub(crate) const ARG_CLOSES_AT: &str = "closes-at";
pub(crate) const ARG_PAGE: &str = "page";
pub(crate) const ARG_PER_PAGE: &str = "per-page";
pub(crate) const ARG_STORE_ID: &str = "store-id";
pub(crate) const ARG_CACHE_MISS_TTL: &str = "cache-miss-ttl-secs";

pub(crate) const ENV_IMPORT_SOURCE: &str = "DELIVERYZONE_CMDS_IMPORT_POSTCODES_SOURCE";
pub(crate) const ENV_ADD_STORE_NAME: &str = "DELIVERYZONE_CMDS_ADD_STORE_NAME";
pub(crate) const ENV_ADD_STORE_POSTCODE: &str = "DELIVERYZONE_CMDS_ADD_STORE_POSTCODE";
pub(crate) const ENV_RESOLVE_POSTCODE: &str = "DELIVERYZONE_CMDS_RESOLVE_POSTCODE";
pub(crate) const ENV_CAN_DELIVER_STORE_ID: &str = "DELIVERYZONE_CMDS_CAN_DELIVER_STORE_ID";

/// Catalog used when no `--database` is configured.
pub(crate) const DEFAULT_DATABASE: &str = "deliveryzone.db";

fn database_or_default(database: Option<Utf8PathBuf>) -> Utf8PathBuf {
    database.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE))
}

/// Cache policy with the miss TTL overridden; zero disables negative caching.
fn cache_policy(cache_miss_ttl_secs: Option<u64>) -> CachePolicy {
    let defaults = CachePolicy::default();
    let missing_ttl = match cache_miss_ttl_secs {
        None => defaults.missing_ttl,
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
    };
    CachePolicy {
        missing_ttl,
        ..defaults
    }
}

fn coordinate_from(lat: Option<f64>, lng: Option<f64>) -> Result<Option<Coordinate>, CliError> {
    match (lat, lng) {
        (Some(latitude), Some(longitude)) => Ok(Some(Coordinate::new(latitude, longitude)?)),
        _ => Ok(None),
    }
}

/// CLI arguments for the `import-postcodes` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "import-postcodes",
    long_about = "Import postcode centroids from a CSV file with postcode, lat \
                 and lng columns. Existing postcodes are updated in place.",
    about = "Import postcode centroids from CSV"
)]
#[ortho_config(prefix = "DELIVERYZONE")]
pub(crate) struct ImportPostcodesArgs {
    /// Path to the SQLite catalog; created when missing.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Path to the CSV file.
    #[arg(long = ARG_SOURCE, value_name = "path")]
    #[serde(default)]
    pub(crate) source: Option<Utf8PathBuf>,
    /// Rows written per transaction.
    #[arg(long = ARG_BATCH, value_name = "rows")]
    #[serde(default)]
    pub(crate) batch: Option<usize>,
}

impl ImportPostcodesArgs {
    pub(crate) fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

/// Resolved `import-postcodes` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) source: Utf8PathBuf,
    pub(crate) batch_size: usize,
}

impl TryFrom<ImportPostcodesArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportPostcodesArgs) -> Result<Self, Self::Error> {
        let source = args.source.ok_or(CliError::MissingArgument {
            field: ARG_SOURCE,
            env: ENV_IMPORT_SOURCE,
        })?;
        Ok(Self {
            database: database_or_default(args.database),
            source,
            batch_size: args.batch.unwrap_or(DEFAULT_BATCH_SIZE),
        })
    }
}

/// CLI arguments for the `add-store` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "add-store",
    long_about = "Register a store. Coordinates are resolved from the postcode \
                 when --lat and --lng are not both given. Stores without \
                 opening hours are treated as always open.",
    about = "Register a store in the catalog"
)]
#[ortho_config(prefix = "DELIVERYZONE")]
pub(crate) struct AddStoreArgs {
    /// Path to the SQLite catalog; created when missing.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Display name of the store.
    #[arg(long = ARG_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) name: Option<String>,
    /// Postcode of the store.
    #[arg(long = ARG_POSTCODE, value_name = "postcode")]
    #[serde(default)]
    pub(crate) postcode: Option<String>,
    /// Latitude of the store.
    #[arg(long = ARG_LAT, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Longitude of the store.
    #[arg(long = ARG_LNG, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lng: Option<f64>,
    /// Delivery radius in kilometres (0.1 to 100, default 5).
    #[arg(long = ARG_RADIUS_KM, value_name = "km")]
    #[serde(default)]
    pub(crate) radius_km: Option<f64>,
    /// IANA timezone (default `Europe/London`).
    #[arg(long = ARG_TIMEZONE, value_name = "zone")]
    #[serde(default)]
    pub(crate) timezone: Option<String>,
    /// Opening time, `HH:MM`.
    #[arg(long = ARG_OPENS_AT, value_name = "HH:MM")]
    #[serde(default)]
    pub(crate) opens_at: Option<String>,
    /// Closing time, `HH:MM`.
    #[arg(long = ARG_CLOSES_AT, value_name = "HH:MM")]
    #[serde(default)]
    pub(crate) closes_at: Option<String>,
}

impl AddStoreArgs {
    pub(crate) fn into_config(self) -> Result<AddStoreConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        AddStoreConfig::try_from(merged)
    }
}

/// Resolved `add-store` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AddStoreConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) draft: StoreDraft,
}

impl TryFrom<AddStoreArgs> for AddStoreConfig {
    type Error = CliError;

    fn try_from(args: AddStoreArgs) -> Result<Self, Self::Error> {
        let name = args.name.ok_or(CliError::MissingArgument {
            field: ARG_NAME,
            env: ENV_ADD_STORE_NAME,
        })?;
        let postcode = args.postcode.ok_or(CliError::MissingArgument {
            field: ARG_POSTCODE,
            env: ENV_ADD_STORE_POSTCODE,
        })?;
        let draft = StoreDraft {
            name,
            postcode,
            location: coordinate_from(args.lat, args.lng)?,
            delivery_radius_km: args.radius_km,
            timezone: args.timezone,
            opens_at: args.opens_at,
            closes_at: args.closes_at,
        };
        Ok(Self {
            database: database_or_default(args.database),
            draft,
        })
    }
}

/// CLI arguments for the `resolve` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "resolve", about = "Resolve a postcode to its centroid")]
#[ortho_config(prefix = "DELIVERYZONE")]
pub(crate) struct ResolveArgs {
    /// Postcode to resolve; case and spacing are normalised.
    #[arg(value_name = "postcode")]
    #[serde(default)]
    pub(crate) postcode: Option<String>,
    /// Path to the SQLite catalog.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Seconds to remember unknown postcodes; 0 disables.
    #[arg(long = ARG_CACHE_MISS_TTL, value_name = "secs")]
    #[serde(default)]
    pub(crate) cache_miss_ttl_secs: Option<u64>,
}

impl ResolveArgs {
    pub(crate) fn into_config(self) -> Result<ResolveConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ResolveConfig::try_from(merged)
    }
}

/// Catalog location and cache policy shared by the read-only commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LookupConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) cache: CachePolicy,
}

impl LookupConfig {
    fn new(database: Option<Utf8PathBuf>, cache_miss_ttl_secs: Option<u64>) -> Self {
        Self {
            database: database_or_default(database),
            cache: cache_policy(cache_miss_ttl_secs),
        }
    }
}

/// Resolved `resolve` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolveConfig {
    pub(crate) lookup: LookupConfig,
    pub(crate) postcode: String,
}

impl TryFrom<ResolveArgs> for ResolveConfig {
    type Error = CliError;

    fn try_from(args: ResolveArgs) -> Result<Self, Self::Error> {
        let postcode = args.postcode.ok_or(CliError::MissingPositional {
            field: ARG_POSTCODE,
            env: ENV_RESOLVE_POSTCODE,
        })?;
        Ok(Self {
            lookup: LookupConfig::new(args.database, args.cache_miss_ttl_secs),
            postcode,
        })
    }
}

/// CLI arguments for the `nearby` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "nearby",
    long_about = "List stores within a radius of a postcode or coordinate, \
                 nearest first. A postcode takes precedence over coordinates.",
    about = "Find stores near a location"
)]
#[ortho_config(prefix = "DELIVERYZONE")]
pub(crate) struct NearbyArgs {
    /// Path to the SQLite catalog.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Seconds to remember unknown postcodes; 0 disables.
    #[arg(long = ARG_CACHE_MISS_TTL, value_name = "secs")]
    #[serde(default)]
    pub(crate) cache_miss_ttl_secs: Option<u64>,
    /// Search origin as a postcode.
    #[arg(long = ARG_POSTCODE, value_name = "postcode")]
    #[serde(default)]
    pub(crate) postcode: Option<String>,
    /// Search origin latitude.
    #[arg(long = ARG_LAT, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Search origin longitude.
    #[arg(long = ARG_LNG, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lng: Option<f64>,
    /// Search radius in kilometres (default 5, at most 200).
    #[arg(long = ARG_RADIUS_KM, value_name = "km")]
    #[serde(default)]
    pub(crate) radius_km: Option<f64>,
    /// One-based page number.
    #[arg(long = ARG_PAGE, value_name = "n")]
    #[serde(default)]
    pub(crate) page: Option<u32>,
    /// Results per page (1 to 100, default 20).
    #[arg(long = ARG_PER_PAGE, value_name = "n")]
    #[serde(default)]
    pub(crate) per_page: Option<u32>,
}

impl NearbyArgs {
    pub(crate) fn into_config(self) -> Result<NearbyConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        NearbyConfig::try_from(merged)
    }
}

/// Resolved `nearby` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NearbyConfig {
    pub(crate) lookup: LookupConfig,
    pub(crate) origin: Option<Location>,
    pub(crate) query: NearbyQuery,
}

impl TryFrom<NearbyArgs> for NearbyConfig {
    type Error = CliError;

    fn try_from(args: NearbyArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            lookup: LookupConfig::new(args.database, args.cache_miss_ttl_secs),
            origin: Location::from_parts(args.lat, args.lng, args.postcode)?,
            query: NearbyQuery::new(args.radius_km, args.page, args.per_page)?,
        })
    }
}

/// CLI arguments for the `can-deliver` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "can-deliver",
    long_about = "Decide whether a store can deliver to a postcode or \
                 coordinate right now, reporting distance, opening state \
                 and an estimated arrival time.",
    about = "Check whether a store can deliver to a location"
)]
#[ortho_config(prefix = "DELIVERYZONE")]
pub(crate) struct CanDeliverArgs {
    /// Identifier of the store.
    #[arg(value_name = "store-id")]
    #[serde(default)]
    pub(crate) store_id: Option<u64>,
    /// Path to the SQLite catalog.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Seconds to remember unknown postcodes; 0 disables.
    #[arg(long = ARG_CACHE_MISS_TTL, value_name = "secs")]
    #[serde(default)]
    pub(crate) cache_miss_ttl_secs: Option<u64>,
    /// Destination postcode.
    #[arg(long = ARG_POSTCODE, value_name = "postcode")]
    #[serde(default)]
    pub(crate) postcode: Option<String>,
    /// Destination latitude.
    #[arg(long = ARG_LAT, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Destination longitude.
    #[arg(long = ARG_LNG, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lng: Option<f64>,
}

impl CanDeliverArgs {
    pub(crate) fn into_config(self) -> Result<CanDeliverConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        CanDeliverConfig::try_from(merged)
    }
}

/// Resolved `can-deliver` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CanDeliverConfig {
    pub(crate) lookup: LookupConfig,
    pub(crate) store_id: StoreId,
    pub(crate) destination: Option<Location>,
}

impl TryFrom<CanDeliverArgs> for CanDeliverConfig {
    type Error = CliError;

    fn try_from(args: CanDeliverArgs) -> Result<Self, Self::Error> {
        let store_id = args.store_id.ok_or(CliError::MissingPositional {
            field: ARG_STORE_ID,
            env: ENV_CAN_DELIVER_STORE_ID,
        })?;
        Ok(Self {
            lookup: LookupConfig::new(args.database, args.cache_miss_ttl_secs),
            store_id: StoreId::new(store_id),
            destination: Location::from_parts(args.lat, args.lng, args.postcode)?,
        })
    }
}

#[cfg(test)]
pub(crate) fn nearby_config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<NearbyConfig, CliError> {
    let merged = NearbyArgs::merge_from_layers(layers).map_err(CliError::from)?;
    NearbyConfig::try_from(merged)
}
