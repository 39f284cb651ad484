//! Tests for the `component` binary's argument handling

use super::common::component_command;
use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn test_help_lists_install() {
    component_command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"));
}

#[test]
fn test_install_help_documents_flags() {
    component_command()
        .args(["install", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dir"))
        .stdout(predicate::str::contains("--concurrency"));
}

#[test]
fn test_install_requires_a_package() {
    component_command()
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}
