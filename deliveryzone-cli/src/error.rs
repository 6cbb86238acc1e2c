//! Error types emitted by the delivery-zone CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use deliveryzone_core::{CoordinateError, DeliveryError, QueryError, SqliteCatalogError};
use deliveryzone_data::{ImportError, PersistStoreError, SchemaError};
use thiserror::Error;

/// Errors emitted by the delivery-zone CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name of the missing option.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A required positional argument is missing after configuration merging.
    #[error("missing <{field}> (pass it as an argument or set {env})")]
    MissingPositional {
        /// Value name of the missing argument.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// Latitude or longitude flags were out of range.
    #[error("invalid coordinates: {0}")]
    InvalidCoordinate(#[from] CoordinateError),
    /// Search paging or radius flags were out of range.
    #[error("invalid search parameters: {0}")]
    InvalidQuery(#[from] QueryError),
    /// Opening the catalog read-only failed.
    #[error(transparent)]
    OpenCatalog(#[from] SqliteCatalogError),
    /// Creating or opening the catalog for writing failed.
    #[error("failed to prepare catalog: {0}")]
    PrepareCatalog(#[from] SchemaError),
    /// Importing postcodes failed.
    #[error("failed to import postcodes: {0}")]
    Import(#[from] ImportError),
    /// Persisting a new store failed.
    #[error(transparent)]
    PersistStore(#[from] PersistStoreError),
    /// The delivery service rejected the request.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    /// Serializing command output failed.
    #[error("failed to serialize output: {0}")]
    SerializeOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
