mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("stand-estimator").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

fn setup() -> (TempDir, String, String) {
    let dir = TempDir::new().unwrap();
    let input = common::write_polygons_csv(dir.path());
    let control = common::write_control(dir.path());
    (
        dir,
        input.to_str().unwrap().to_string(),
        control.to_str().unwrap().to_string(),
    )
}

// --- Estimate subcommand ---

#[test]
fn test_estimate_prints_yields() {
    let (_dir, input, control) = setup();

    cmd()
        .args(["estimate", "--input", &input, "--control", &control])
        .assert()
        .success()
        .stdout(predicate::str::contains("Polygon P1"))
        .stdout(predicate::str::contains("Veteran layer"))
        .stdout(predicate::str::contains("Processed: 2"))
        .stdout(predicate::str::contains("P3"));
}

#[test]
fn test_estimate_writes_csv() {
    let (dir, input, control) = setup();
    let output = dir.path().join("yields.csv");

    cmd()
        .args([
            "estimate",
            "--input",
            &input,
            "--control",
            &control,
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Success:"));

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("polygon_id,layer,genus,utilization_class"));
    assert!(content.contains("P2,Primary,H,All"));
}

#[test]
fn test_estimate_writes_pretty_json() {
    let (dir, input, control) = setup();
    let output = dir.path().join("yields.json");

    cmd()
        .args([
            "estimate",
            "--input",
            &input,
            "--control",
            &control,
            "--output",
            output.to_str().unwrap(),
            "--pretty",
        ])
        .assert()
        .success();

    let rows: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert!(!rows.is_empty());
}

#[test]
fn test_estimate_control_from_config() {
    let (dir, input, control) = setup();
    let config = dir.path().join("estimator.toml");
    std::fs::write(
        &config,
        format!("control_file = {control:?}\nthreads = 2\n\n[minima]\nheight = 5.0\n"),
    )
    .unwrap();

    cmd()
        .args(["estimate", "--input", &input, "--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed: 2"));
}

#[test]
fn test_estimate_without_control_fails() {
    let (_dir, input, _control) = setup();

    cmd()
        .args(["estimate", "--input", &input])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No control file"));
}

#[test]
fn test_estimate_unsupported_output() {
    let (dir, input, control) = setup();
    let output = dir.path().join("yields.txt");

    cmd()
        .args([
            "estimate",
            "--input",
            &input,
            "--control",
            &control,
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported output format"));
}

#[test]
fn test_unsupported_input_format() {
    let (dir, _input, control) = setup();
    let input = dir.path().join("polygons.txt");
    std::fs::write(&input, "not polygons").unwrap();

    cmd()
        .args(["estimate", "--input", input.to_str().unwrap(), "--control", &control])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}

#[test]
fn test_missing_input_file() {
    let (_dir, _input, control) = setup();

    cmd()
        .args(["estimate", "--input", "nonexistent.csv", "--control", &control])
        .assert()
        .failure();
}

// --- Validate subcommand ---

#[test]
fn test_validate_reports_invalid_polygon() {
    let (_dir, input, control) = setup();

    cmd()
        .args(["validate", "--input", &input, "--control", &control])
        .assert()
        .failure()
        .stdout(predicate::str::contains("ok P1 (Start)"))
        .stdout(predicate::str::contains("invalid P3"))
        .stderr(predicate::str::contains("1 of 3 polygons failed validation"));
}

#[test]
fn test_validate_success() {
    let dir = TempDir::new().unwrap();
    let control = common::write_control(dir.path());
    let input = dir.path().join("polygons.json");
    let polygons = vec![common::polygon("A"), common::polygon_with_veteran("B")];
    std::fs::write(&input, serde_json::to_string(&polygons).unwrap()).unwrap();

    cmd()
        .args([
            "validate",
            "--input",
            input.to_str().unwrap(),
            "--control",
            control.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("All 2 polygons valid"));
}

// --- Summary subcommand ---

#[test]
fn test_summary_statistics() {
    let (_dir, input, control) = setup();

    cmd()
        .args(["summary", "--input", &input, "--control", &control])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stand Statistics"))
        .stdout(predicate::str::contains("Sample Size: 2 polygons"))
        .stdout(predicate::str::contains("Net DWB"));
}

#[test]
fn test_summary_custom_confidence() {
    let (_dir, input, control) = setup();

    cmd()
        .args([
            "summary",
            "--input",
            &input,
            "--control",
            &control,
            "--confidence",
            "0.90",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Confidence Level: 90%"));
}

// --- General ---

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("estimate"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("summary"));
}

#[test]
fn test_version() {
    cmd().arg("--version").assert().success();
}

#[test]
fn test_no_subcommand() {
    cmd().assert().failure();
}
