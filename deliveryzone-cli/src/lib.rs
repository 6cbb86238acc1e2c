//! Command-line interface for the delivery-zone catalog.
//!
//! Each subcommand prints one JSON document on stdout. Arguments may be
//! layered from CLI flags, `DELIVERYZONE_*` environment variables and
//! configuration files.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};
use serde::Serialize;

mod commands;
mod config;
mod error;

use config::{AddStoreArgs, CanDeliverArgs, ImportPostcodesArgs, NearbyArgs, ResolveArgs};
pub use error::CliError;

/// Run the delivery-zone CLI with the current process arguments and
/// environment.
///
/// # Errors
/// Returns [`CliError`] when arguments are invalid, the catalog cannot be
/// used or the requested operation fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    execute(cli.command, &mut stdout)
}

#[derive(Debug, Parser)]
#[command(
    name = "deliveryzone",
    about = "Match customers to stores that can deliver to them",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import postcode centroids from CSV.
    ImportPostcodes(ImportPostcodesArgs),
    /// Register a store.
    AddStore(AddStoreArgs),
    /// Resolve a postcode to coordinates.
    Resolve(ResolveArgs),
    /// List stores near a location.
    Nearby(NearbyArgs),
    /// Check whether a store can deliver to a location now.
    CanDeliver(CanDeliverArgs),
}

fn execute(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::ImportPostcodes(args) => {
            let report = commands::import(&args.into_config()?)?;
            write_json(writer, &report)
        }
        Command::AddStore(args) => write_json(writer, &commands::add_store(args.into_config()?)?),
        Command::Resolve(args) => write_json(writer, &commands::resolve(&args.into_config()?)?),
        Command::Nearby(args) => write_json(writer, &commands::nearby(args.into_config()?)?),
        Command::CanDeliver(args) => {
            write_json(writer, &commands::can_deliver(args.into_config()?)?)
        }
    }
}

fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerializeOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
