#![cfg(unix)]

mod common;

use common::StubServer;
use common::harness_cmd;
use predicates::prelude::*;
use serde_json::Value;

#[test]
fn list_shows_standard_scenarios() {
    harness_cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("predict_session_bundle"))
        .stdout(predicate::str::contains("predict_batching_session_bundle"))
        .stdout(predicate::str::contains("predict_upconverted_saved_model"))
        .stdout(predicate::str::contains("bad_model_upconverted_saved_model"));
}

#[test]
fn list_json_is_an_array_of_six() {
    let output = harness_cmd().args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 6);
    assert_eq!(items[4]["expect"], "rejects_model");
    assert_eq!(items[2]["use_saved_model"], true);
}

#[test]
fn pick_port_prints_a_port() {
    let output = harness_cmd().arg("pick-port").output().unwrap();
    assert!(output.status.success());
    let port: u16 = String::from_utf8_lossy(&output.stdout).trim().parse().unwrap();
    assert_ne!(port, 0);
}

#[test]
fn completions_generate_for_bash() {
    harness_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("predict-harness"));
}

#[test]
fn predict_against_closed_port_is_a_transport_failure() {
    let port = predict_harness::pick_unused_port().unwrap();
    harness_cmd()
        .args(["predict", "--address", &format!("localhost:{}", port), "--timeout-secs", "2"])
        .assert()
        .code(75)
        .stderr(predicate::str::contains("Transport failure"));
}

#[test]
fn predict_error_as_json() {
    let port = predict_harness::pick_unused_port().unwrap();
    let output = harness_cmd()
        .args(["predict", "--json", "-a", &format!("127.0.0.1:{}", port)])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(75));
    let json: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(json["category"], "transport");
    assert_eq!(json["status"]["code"], "UNAVAILABLE");
}

#[test]
fn predict_rejects_malformed_address() {
    harness_cmd()
        .args(["predict", "--address", "not a uri"])
        .assert()
        .code(78)
        .stderr(predicate::str::contains("Invalid server address"));
}

#[test]
fn run_with_missing_binary_is_an_environment_error() {
    let stub = StubServer::sleeping().with_fixtures();
    harness_cmd()
        .args(["run", "--binary"])
        .arg(stub.path().join("absent"))
        .arg("--testdata")
        .arg(stub.testdata())
        .arg("--saved-model")
        .arg(stub.saved_model())
        .assert()
        .code(78)
        .stderr(predicate::str::contains("Server binary not found"))
        .stderr(predicate::str::contains("PREDICT_HARNESS_SERVER_BIN"));
}

#[test]
fn run_with_missing_fixtures_is_an_environment_error() {
    let stub = StubServer::sleeping();
    harness_cmd()
        .args(["run", "--binary"])
        .arg(&stub.binary)
        .arg("--testdata")
        .arg(stub.testdata())
        .arg("--saved-model")
        .arg(stub.saved_model())
        .assert()
        .code(78)
        .stderr(predicate::str::contains("Fixture 'session_bundle' not found"));
}

#[test]
fn run_only_needs_fixtures_of_selected_scenarios() {
    let stub = StubServer::sleeping();
    std::fs::create_dir_all(stub.testdata().join("half_plus_two")).unwrap();

    harness_cmd()
        .args(["run", "--settle-ms", "0", "--timeout-secs", "2"])
        .args(["--scenario", "predict_session_bundle"])
        .arg("--binary")
        .arg(&stub.binary)
        .arg("--testdata")
        .arg(stub.testdata())
        .arg("--saved-model")
        .arg(stub.saved_model())
        .assert()
        .code(75)
        .stdout(predicate::str::contains("FAIL predict_session_bundle"))
        .stderr(predicate::str::contains("Fixture").not());
}

#[test]
fn run_unknown_scenario() {
    harness_cmd()
        .args(["run", "--scenario", "predict_everything"])
        .assert()
        .code(78)
        .stderr(predicate::str::contains("Unknown scenario 'predict_everything'"));
}

#[test]
fn run_against_silent_server_reports_failure_and_cleans_up() {
    let stub = StubServer::sleeping().with_fixtures();
    let output = harness_cmd()
        .args(["run", "--json", "--settle-ms", "0", "--timeout-secs", "2"])
        .args(["--scenario", "predict_session_bundle"])
        .args(["--scenario", "bad_model_session_bundle"])
        .arg("--binary")
        .arg(&stub.binary)
        .arg("--testdata")
        .arg(stub.testdata())
        .arg("--saved-model")
        .arg(stub.saved_model())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(75));
    let suite: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(suite["passed"], 0);
    assert_eq!(suite["failed"], 2);

    let reports = suite["scenarios"].as_array().unwrap();
    assert_eq!(reports[0]["name"], "predict_session_bundle");
    assert_eq!(reports[1]["name"], "bad_model_session_bundle");
    for report in reports {
        assert_eq!(report["failure"]["category"], "transport");
        assert_eq!(report["states"].as_array().unwrap().last().unwrap(), "terminated");
        assert_eq!(report["termination"], "terminated");
        assert_eq!(report["port_released"], true);
        let pid = report["pid"].as_u64().unwrap() as u32;
        assert!(!common::pid_exists(pid));
    }
}

#[test]
fn run_text_output_marks_failures() {
    let stub = StubServer::sleeping().with_fixtures();
    harness_cmd()
        .args(["run", "--settle-ms", "0", "--timeout-secs", "2"])
        .args(["--scenario", "predict_saved_model"])
        .arg("--binary")
        .arg(&stub.binary)
        .arg("--testdata")
        .arg(stub.testdata())
        .arg("--saved-model")
        .arg(stub.saved_model())
        .assert()
        .code(75)
        .stdout(predicate::str::contains("FAIL predict_saved_model"))
        .stdout(predicate::str::contains("0 passed, 1 failed"));
}
