//! CLI Integration Tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[test]
fn test_checksum_subcommand_prints_md5() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"abc").unwrap();

    Command::cargo_bin("omics-uploadr")
        .unwrap()
        .args(["checksum", "--chunk-size", "1"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "900150983cd24fb0d6963f7d28e17f72",
        ));
}

#[test]
fn test_upload_with_missing_config_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"abc").unwrap();

    Command::cargo_bin("omics-uploadr")
        .unwrap()
        .args(["--config", "/nonexistent/omics.yaml", "upload"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading /nonexistent/omics.yaml"));
}

#[test]
fn test_malformed_field_rejected() {
    Command::cargo_bin("omics-uploadr")
        .unwrap()
        .args(["upload", "data.csv", "--field", "no-equals"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected key=value"));
}
