//! Test helpers for building catalogs and CSV inputs on disk.

use camino::{Utf8Path, Utf8PathBuf};
use deliveryzone_core::{
    Coordinate, Postcode, PostcodeRecord,
    test_support::{sample_store, write_sqlite_catalog},
};
use std::fs;
use tempfile::TempDir;

pub(super) const PALACE: (f64, f64) = (51.501_009, -0.141_588);
pub(super) const BARBICAN: (f64, f64) = (51.520_18, -0.097_79);
pub(super) const MANCHESTER: (f64, f64) = (53.479_251, -2.247_926);

/// A temporary directory holding a catalog path and a CSV path.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    database: Utf8PathBuf,
    csv: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self {
            database: root.join("catalog.db"),
            csv: root.join("postcodes.csv"),
            _dir: dir,
        }
    }

    pub(super) fn database(&self) -> &Utf8Path {
        &self.database
    }

    pub(super) fn csv(&self) -> &Utf8Path {
        &self.csv
    }

    /// Write a CSV naming the Barbican and Buckingham Palace postcodes.
    pub(super) fn write_postcode_csv(&self) {
        let contents = format!(
            "postcode,lat,lng\nec2y 8ds,{},{}\nSW1A 1AA,{},{}\n",
            BARBICAN.0, BARBICAN.1, PALACE.0, PALACE.1
        );
        fs::write(&self.csv, contents).expect("write CSV");
    }

    /// Write a catalog with a 1 km store at the Palace and a 5 km store in
    /// Manchester, plus both London postcodes.
    pub(super) fn write_london_and_manchester(&self) {
        let stores = [
            sample_store(1, PALACE.0, PALACE.1, 1.0),
            sample_store(2, MANCHESTER.0, MANCHESTER.1, 5.0),
        ];
        let postcodes = [record("EC2Y 8DS", BARBICAN), record("SW1A 1AA", PALACE)];
        write_sqlite_catalog(self.database.as_std_path(), &stores, &postcodes)
            .expect("write catalog");
    }
}

fn record(postcode: &str, (lat, lng): (f64, f64)) -> PostcodeRecord {
    PostcodeRecord {
        postcode: Postcode::new(postcode),
        location: Coordinate::new(lat, lng).expect("valid coordinate"),
    }
}
