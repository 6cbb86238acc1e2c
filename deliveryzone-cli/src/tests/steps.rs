//! Behaviour-driven step definitions driving the CLI end to end.

use super::helpers::{BARBICAN, PALACE, Workspace};
use super::*;
use crate::config::ARG_STORE_ID;
use deliveryzone_core::{DeliveryError, test_support::sample_store};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use std::cell::RefCell;

/// Aggregates CLI scenario state so each step only needs a single world
/// argument.
#[derive(Debug)]
struct CliWorld {
    workspace: Workspace,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl CliWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn run(&self, args: &[&str]) {
        let mut argv = vec!["deliveryzone".to_owned()];
        argv.extend(args.iter().map(|arg| (*arg).to_owned()));
        argv.extend([
            format!("--{}", config::ARG_DATABASE),
            self.workspace.database().as_str().to_owned(),
        ]);

        let mut buffer = self.stdout.borrow_mut();
        buffer.clear();
        let outcome = Cli::try_parse_from(argv)
            .map_err(CliError::from)
            .and_then(|cli| execute(cli.command, &mut *buffer));
        self.result.replace(Some(outcome));
    }

    fn output(&self) -> Value {
        let borrowed = self.result.borrow();
        borrowed
            .as_ref()
            .expect("result recorded")
            .as_ref()
            .expect("expected success");
        serde_json::from_slice(&self.stdout.borrow()).expect("stdout should be JSON")
    }

    fn with_error(&self, check: impl FnOnce(&CliError)) {
        let borrowed = self.result.borrow();
        let error = borrowed
            .as_ref()
            .expect("result recorded")
            .as_ref()
            .expect_err("expected error");
        check(error);
    }
}

#[fixture]
fn world() -> CliWorld {
    CliWorld::new()
}

fn assert_location(value: &Value, (lat, lng): (f64, f64)) {
    assert_eq!(value["latitude"].as_f64(), Some(lat), "latitude in {value}");
    assert_eq!(value["longitude"].as_f64(), Some(lng), "longitude in {value}");
}

#[given("a postcode CSV naming the Barbican and the Palace")]
fn postcode_csv(#[from(world)] world: &CliWorld) {
    world.workspace.write_postcode_csv();
}

#[given("a catalog with stores in London and Manchester")]
fn london_and_manchester(#[from(world)] world: &CliWorld) {
    world.workspace.write_london_and_manchester();
}

#[when("I run import-postcodes with the CSV")]
fn run_import(#[from(world)] world: &CliWorld) {
    let csv = world.workspace.csv().as_str().to_owned();
    world.run(&["import-postcodes", "--source", &csv]);
}

#[when("I run resolve for \"ec2y 8ds\"")]
fn run_resolve_barbican(#[from(world)] world: &CliWorld) {
    world.run(&["resolve", "ec2y 8ds"]);
}

#[when("I run resolve for \"ZZ9 9ZZ\"")]
fn run_resolve_unknown(#[from(world)] world: &CliWorld) {
    world.run(&["resolve", "ZZ9 9ZZ"]);
}

#[when("I run add-store for \"Palace Pantry\" at postcode \"SW1A 1AA\"")]
fn run_add_store(#[from(world)] world: &CliWorld) {
    world.run(&[
        "add-store",
        "--name",
        "Palace Pantry",
        "--postcode",
        "SW1A 1AA",
        "--opens-at",
        "08:00",
        "--closes-at",
        "22:00",
    ]);
}

#[when("I run nearby around postcode \"EC2Y 8DS\" within 10 km")]
fn run_nearby(#[from(world)] world: &CliWorld) {
    world.run(&["nearby", "--postcode", "EC2Y 8DS", "--radius-km", "10"]);
}

#[when("I run can-deliver for store 1 to postcode \"EC2Y 8DS\"")]
fn run_can_deliver(#[from(world)] world: &CliWorld) {
    world.run(&["can-deliver", "1", "--postcode", "EC2Y 8DS"]);
}

#[when("I run can-deliver without a store id")]
fn run_can_deliver_without_store(#[from(world)] world: &CliWorld) {
    world.run(&["can-deliver", "--postcode", "EC2Y 8DS"]);
}

#[then("the import reports 2 postcodes imported")]
fn import_reported(#[from(world)] world: &CliWorld) {
    let output = world.output();
    assert_eq!(output["processed"], 2);
    assert_eq!(output["skipped"], 0);
    assert_eq!(output["imported"], 2);
}

#[then("the resolved location is the Barbican")]
fn resolved_barbican(#[from(world)] world: &CliWorld) {
    let output = world.output();
    assert_eq!(output["postcode"], "EC2Y 8DS");
    assert_location(&output["location"], BARBICAN);
}

#[then("the new store is printed with id 1 at the Palace")]
fn store_printed(#[from(world)] world: &CliWorld) {
    let output = world.output();
    assert_eq!(output["id"], 1);
    assert_eq!(output["name"], "Palace Pantry");
    assert_eq!(output["postcode"], "SW1A 1AA");
    assert_eq!(output["timezone"], "Europe/London");
    assert_eq!(output["opens_at"], "08:00");
    assert_eq!(output["closes_at"], "22:00");
    assert_location(&output["location"], PALACE);
}

#[then("only store 1 is listed")]
fn only_store_one(#[from(world)] world: &CliWorld) {
    let output = world.output();
    let ids: Vec<_> = output["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["id"].as_u64())
        .collect();
    assert_eq!(ids, vec![Some(1)]);
    assert_eq!(output["total"], 1);
}

#[then("the decision declines with OUT_OF_RANGE")]
fn declines_out_of_range(#[from(world)] world: &CliWorld) {
    let output = world.output();
    assert_eq!(output["can_deliver"], false);
    assert_eq!(output["is_open"], true);
    assert_eq!(output["reason"], "OUT_OF_RANGE");
    let expected_radius = sample_store(1, PALACE.0, PALACE.1, 1.0).delivery_radius_km;
    assert_eq!(output["store_radius_km"].as_f64(), Some(expected_radius));
}

#[then("the CLI reports that the \"store-id\" argument is missing")]
fn reports_missing_store_id(#[from(world)] world: &CliWorld) {
    world.with_error(|error| match error {
        CliError::MissingPositional { field, .. } => assert_eq!(*field, ARG_STORE_ID),
        other => panic!("expected MissingPositional, found {other:?}"),
    });
}

#[then("the CLI reports that the postcode was not found")]
fn reports_unknown_postcode(#[from(world)] world: &CliWorld) {
    world.with_error(|error| match error {
        CliError::Delivery(DeliveryError::PostcodeNotFound { postcode }) => {
            assert_eq!(postcode.as_str(), "ZZ9 9ZZ");
        }
        other => panic!("expected PostcodeNotFound, found {other:?}"),
    });
}

macro_rules! register_cli_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/cli.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CliWorld) {
            let _ = world;
        }
    };
}

register_cli_scenario!(import_then_resolve, "importing postcodes then resolving one");
register_cli_scenario!(register_by_postcode, "registering a store by postcode");
register_cli_scenario!(search_near_postcode, "searching near a postcode");
register_cli_scenario!(deliver_out_of_range, "checking delivery outside the radius");
register_cli_scenario!(missing_store_id, "rejecting a missing store id");
register_cli_scenario!(unknown_postcode, "reporting an unknown postcode");
