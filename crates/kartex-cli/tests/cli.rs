use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use kartex_core::PatternRegistry;

fn kartex() -> Command {
    Command::cargo_bin("kartex").unwrap()
}

#[test]
fn test_versions_lists_builtin_history() {
    kartex()
        .arg("versions")
        .assert()
        .success()
        .stdout(predicate::str::contains("2.2.0"))
        .stdout(predicate::str::contains("2.4.0 (latest)"));
}

#[test]
fn test_extract_file_as_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("card.txt");
    fs::write(&input, "ООО \"ПАРТНЕР\"\nИНН: 9705227092\n").unwrap();

    kartex()
        .arg("extract")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tax_id\""))
        .stdout(predicate::str::contains("9705227092"))
        .stdout(predicate::str::contains("\"registry_version\": \"2.4.0\""));
}

#[test]
fn test_extract_stdin_as_csv() {
    kartex()
        .args(["extract", "-", "--format", "csv", "--registry-version", "2.2.0"])
        .write_stdin("ИНН: 9705227092")
        .assert()
        .success()
        .stdout(predicate::str::contains("field,value,confidence,source,rank"))
        .stdout(predicate::str::contains("tax_id,9705227092,"));
}

#[test]
fn test_extract_sole_proprietor_pair() {
    kartex()
        .args(["extract", "-", "--format", "csv"])
        .write_stdin("ИНН/КПП: 183271969239/325180000053059")
        .assert()
        .success()
        .stdout(predicate::str::contains("tax_id,183271969239,"))
        .stdout(predicate::str::contains("registration_number,325180000053059,"));
}

#[test]
fn test_extract_missing_file_fails() {
    kartex()
        .args(["extract", "/nonexistent/card.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_extract_unknown_version_fails() {
    kartex()
        .args(["extract", "-", "--registry-version", "9.9.9"])
        .write_stdin("ИНН: 9705227092")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown registry version: 9.9.9"));
}

#[test]
fn test_regress_builtin_corpus() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("report.json");
    let summary = dir.path().join("summary.csv");

    kartex()
        .args(["regress", "--jobs", "2", "--output"])
        .arg(&report)
        .arg("--summary")
        .arg(&summary)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cards: 9 total, 9 passed, 0 failed, 0 crashed"));

    let json = fs::read_to_string(&report).unwrap();
    assert!(json.contains("\"registry_version\": \"2.4.0\""));

    let csv = fs::read_to_string(&summary).unwrap();
    assert_eq!(csv.lines().count(), 10);
    assert!(csv.starts_with("card_id,label,status"));
}

#[test]
fn test_regress_against_older_version() {
    kartex()
        .args(["regress", "--against", "2.2.0", "--fail-on-regression"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No regressions against 2.2.0"));
}

#[test]
fn test_regress_flags_recorded_success_without_baseline() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("cards.json");
    fs::write(
        &corpus,
        r#"{"cards": [{
            "id": "card_blank",
            "label": "BLANK",
            "added": "2025-09-12",
            "status": "success",
            "recorded_version": "2.3.0",
            "raw_text": "нет данных",
            "expected": {"tax_id": "7701000001"}
        }]}"#,
    )
    .unwrap();

    kartex()
        .args(["regress", "--fail-on-regression", "--corpus"])
        .arg(&corpus)
        .assert()
        .failure()
        .stdout(predicate::str::contains("1 regression(s) against recorded card status"))
        .stdout(predicate::str::contains("card_blank"))
        .stderr(predicate::str::contains("1 regression(s) found"));
}

#[test]
fn test_compare_verdict() {
    kartex()
        .args(["compare", "2.2.0", "2.3.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registry 2.2.0 -> 2.3.0"))
        .stdout(predicate::str::contains("Verdict: safe to publish 2.3.0"));
}

#[test]
fn test_publish_requires_registry_file() {
    kartex()
        .args(["compare", "2.2.0", "2.3.0", "--publish"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs a registry file"));
}

#[test]
fn test_publish_writes_registry_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registry.json");
    PatternRegistry::builtin().unwrap().to_file(&path).unwrap();

    kartex()
        .args(["compare", "2.2.0", "2.3.0", "--publish", "--registry"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Published registry 2.3.0"));

    let registry = PatternRegistry::from_file(&path).unwrap();
    assert!(registry.is_published("2.3.0"));
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_trial_reports_per_card() {
    kartex()
        .args(["trial", "tax_id", r"ИНН:?\s*(\d{10}|\d{12})\b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("card_001"))
        .stdout(predicate::str::contains("tax_id correct on"));
}

#[test]
fn test_trial_rejects_unknown_field() {
    kartex()
        .args(["trial", "vat_number", r"(\d+)"])
        .assert()
        .failure();
}

#[test]
fn test_config_init_and_get() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kartex").join("config.json");

    kartex()
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(path.exists());

    kartex()
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    kartex()
        .arg("--config")
        .arg(&path)
        .args(["config", "get", "regression.pass_threshold"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.75"));
}

#[test]
fn test_config_set_rejects_bad_value() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    kartex()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "regression.workers", "2"])
        .assert()
        .success();

    kartex()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "regression.workers", "many"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value"));
}

#[test]
fn test_config_disables_fallback() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"extraction": {"enable_fallback": false}}"#).unwrap();

    kartex()
        .arg("--config")
        .arg(&path)
        .args(["extract", "-", "--registry-version", "2.2.0"])
        .write_stdin("8801234567 / 880101001")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"fields\": {}"));
}
