#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn knitgen() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("knitgen"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_markdown_is_default_output() {
    knitgen()
        .arg("a cozy cable blanket")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Simple Cable Blanket"))
        .stdout(predicate::str::contains("Cast on 200 stitches"));
}

#[test]
fn test_summary_format_is_json() {
    let output = knitgen()
        .args(["simple blanket", "--format", "summary"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["is_valid"], false);
    assert_eq!(summary["quick_stats"]["yarn_needed"], "8640 yards worsted weight wool");
}

#[test]
fn test_strict_mode_fails_on_validation_errors() {
    knitgen()
        .args(["simple blanket", "--strict"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Width calculation error"));
}

#[test]
fn test_strict_mode_passes_when_border_fits_tolerance() {
    // at 20 sts/in the 8 border stitches add only 0.4"
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[gauges.worsted]\nstitches_per_inch = 20.0\nrows_per_inch = 5.5"
    )
    .unwrap();

    knitgen()
        .args(["simple blanket", "--strict", "--format", "text", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Cast on 968 stitches"))
        .stdout(predicate::str::contains("SUGGESTION: Very tight gauge"));
}

#[test]
fn test_blank_request_exits_with_input_error() {
    knitgen()
        .arg("   ")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("input_validation"));
}

#[test]
fn test_invalid_tables_exit_with_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[gauges.worsted]\nstitches_per_inch = -4.0\nrows_per_inch = 5.5").unwrap();

    knitgen()
        .args(["blanket", "--config"])
        .arg(file.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("gauges.worsted.stitches_per_inch"));
}
