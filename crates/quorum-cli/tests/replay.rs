//! End-to-end replay of scripts through the CLI handlers.

use quorum_cli::commands::{check::summarize, replay};
use quorum_cli::parse_script;
use quorum_core::{Address, VaultConfig};
use serde_json::Value;
use std::io::Write;

const CONFIG: &str = r#"
[owners]
addresses = [
    "0x00000000000000000000000000000000000000a1",
    "0x00000000000000000000000000000000000000a2",
    "0x00000000000000000000000000000000000000a3",
]
threshold = 2

[whitelist]
entries = [{ address = "0x0000000000000000000000000000000000000057", cap = 5 }]

[daily_limit]
limit = 100

[recovery]
guardians = [
    "0x00000000000000000000000000000000000000c1",
    "0x00000000000000000000000000000000000000c2",
]
threshold = 2
period_secs = 60
"#;

const A1: &str = "0x00000000000000000000000000000000000000a1";
const A2: &str = "0x00000000000000000000000000000000000000a2";
const A3: &str = "0x00000000000000000000000000000000000000a3";
const C1: &str = "0x00000000000000000000000000000000000000c1";
const C2: &str = "0x00000000000000000000000000000000000000c2";
const X: &str = "0x0000000000000000000000000000000000000058";
const W: &str = "0x0000000000000000000000000000000000000057";

fn run(script: &str, revert: &[Address], fail_fast: bool) -> (anyhow::Result<()>, Vec<Value>) {
    let config = VaultConfig::from_toml_str(CONFIG).unwrap();
    let lines = parse_script(script).unwrap();
    let mut out = Vec::new();
    let result = replay(&config, &lines, revert, fail_fast, &mut out).map(|_| ());
    let records = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (result, records)
}

fn of_type<'a>(records: &'a [Value], kind: &str) -> Vec<&'a Value> {
    records.iter().filter(|r| r["type"] == kind).collect()
}

#[test]
fn approval_pipeline_script() {
    let script = format!(
        r#"{{"at": 0, "actor": "{A1}", "cmd": "propose", "label": "pay", "operation": {{"kind": "call", "to": "{X}", "value": 10}}}}
{{"at": 1, "actor": "{A1}", "cmd": "approve", "tx": "pay"}}
{{"at": 2, "actor": "{A1}", "cmd": "execute", "tx": "pay"}}
{{"at": 3, "actor": "{A2}", "cmd": "approve", "tx": "pay"}}
{{"at": 4, "actor": "{A3}", "cmd": "execute", "tx": "pay"}}
"#
    );
    let (result, records) = run(&script, &[], false);
    result.unwrap();

    let outcomes = of_type(&records, "outcome");
    assert_eq!(outcomes.len(), 5);
    assert_eq!(outcomes[0]["ok"]["result"], "proposed");
    assert_eq!(outcomes[2]["error"]["kind"], "state");
    assert!(outcomes[4]["error"].is_null());

    let kinds: Vec<&str> = of_type(&records, "event")
        .iter()
        .map(|r| r["event"]["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["proposed", "approved", "approved", "executed"]);

    let snapshot = &records.last().unwrap()["snapshot"];
    assert_eq!(snapshot["transactions"][0]["status"]["state"], "executed");
}

#[test]
fn events_follow_the_outcome_that_committed_them() {
    let script = format!(
        r#"{{"at": 0, "actor": "{A1}", "cmd": "bypass-whitelist", "call": {{"to": "{W}", "value": 5}}}}
{{"at": 1, "actor": "{A1}", "cmd": "bypass-whitelist", "call": {{"to": "{W}", "value": 6}}}}
{{"at": 2, "actor": "{A1}", "cmd": "submit", "label": "big", "call": {{"to": "{X}", "value": 101}}}}
"#
    );
    let (result, records) = run(&script, &[], false);
    result.unwrap();

    let types: Vec<&str> = records
        .iter()
        .map(|r| r["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec!["outcome", "event", "outcome", "outcome", "event", "snapshot"]
    );
    assert_eq!(records[0]["ok"]["decision"]["outcome"], "executed");
    assert_eq!(records[2]["ok"]["decision"]["outcome"], "refused");
    assert_eq!(records[3]["ok"]["submission"]["path"], "proposed");
}

#[test]
fn reverting_target_is_reported_and_fail_fast_stops() {
    let script = format!(
        r#"{{"at": 0, "actor": "{A1}", "cmd": "bypass-daily", "call": {{"to": "{X}", "value": 10}}}}
{{"at": 1, "actor": "{A1}", "cmd": "bypass-daily", "call": {{"to": "{W}", "value": 10}}}}
"#
    );
    let x: Address = X.parse().unwrap();

    let (result, records) = run(&script, &[x], true);
    let err = result.unwrap_err();
    assert!(err.to_string().contains("line 1"));
    let outcomes = of_type(&records, "outcome");
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0]["error"]["kind"], "effect_failure");
    assert!(of_type(&records, "snapshot").is_empty());

    let (result, records) = run(&script, &[x], false);
    result.unwrap();
    assert_eq!(of_type(&records, "outcome").len(), 2);
    let snapshot = &records.last().unwrap()["snapshot"];
    assert_eq!(snapshot["daily_limit"]["spent"], "10");
}

#[test]
fn recovery_script_replaces_owners() {
    let script = format!(
        r#"{{"at": 0, "actor": "{C1}", "cmd": "initiate-recovery", "label": "r", "new_owners": ["{X}"], "new_threshold": 1}}
{{"at": 1000, "actor": "{C2}", "cmd": "approve-recovery", "recovery": "r"}}
{{"at": 30000, "actor": "{C1}", "cmd": "execute-recovery", "recovery": "r"}}
{{"at": 61000, "actor": "{C1}", "cmd": "execute-recovery", "recovery": "r"}}
{{"at": 62000, "actor": "{A1}", "cmd": "cancel-recovery", "recovery": "missing"}}
"#
    );
    let (result, records) = run(&script, &[], false);
    result.unwrap();

    let outcomes = of_type(&records, "outcome");
    assert_eq!(outcomes[1]["ok"]["phase"], "approved");
    assert_eq!(outcomes[2]["error"]["kind"], "state");
    assert!(outcomes[3]["error"].is_null());
    assert_eq!(outcomes[4]["error"]["kind"], "not_found");

    let snapshot = &records.last().unwrap()["snapshot"];
    assert_eq!(snapshot["owners"], serde_json::json!([X]));
    assert_eq!(snapshot["threshold"], 1);
}

#[test]
fn config_file_round_trip_through_check() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();

    let config = VaultConfig::load_from_file(file.path()).unwrap();
    let summary = summarize(&config).unwrap();
    assert!(summary.contains("owners: 3 (threshold 2)"));
    assert!(summary.contains("(cap 5)"));
    assert!(summary.contains("daily limit: 100"));
    assert!(summary.contains("recovery: 2 of 2 guardians, time lock 60s"));
}

#[test]
fn demo_walkthrough_replays_end_to_end() {
    let config =
        VaultConfig::from_toml_str(include_str!("../../../demos/vault.toml")).unwrap();
    let lines = parse_script(include_str!("../../../demos/walkthrough.jsonl")).unwrap();
    let mut out = Vec::new();
    let report = replay(&config, &lines, &[], false, &mut out).unwrap();
    assert_eq!(report.steps, 16);
    assert_eq!(report.rejected, 1);

    let records: Vec<Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let outcomes = of_type(&records, "outcome");
    let rejected: Vec<&&Value> = outcomes.iter().filter(|o| !o["error"].is_null()).collect();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0]["command"], "execute-recovery");
    assert_eq!(rejected[0]["error"]["kind"], "state");

    let snapshot = &records.last().unwrap()["snapshot"];
    assert_eq!(
        snapshot["owners"],
        serde_json::json!([
            "0x00000000000000000000000000000000000000d1",
            "0x00000000000000000000000000000000000000d2"
        ])
    );
    assert_eq!(snapshot["threshold"], 1);
    assert_eq!(snapshot["daily_limit"]["spent"], "90");
    assert_eq!(snapshot["bypass_log"].as_array().unwrap().len(), 2);
    assert_eq!(snapshot["transactions"][0]["operation"]["value"], "10");
}

#[test]
fn large_amounts_round_trip_through_scripts() {
    let script = format!(
        r#"{{"at": 0, "actor": "{A1}", "cmd": "propose", "label": "huge", "operation": {{"kind": "call", "to": "{X}", "value": "340282366920938463463374607431768211455"}}}}
"#
    );
    let (result, records) = run(&script, &[], false);
    result.unwrap();
    let snapshot = &records.last().unwrap()["snapshot"];
    assert_eq!(
        snapshot["transactions"][0]["operation"]["value"],
        "340282366920938463463374607431768211455"
    );
}
