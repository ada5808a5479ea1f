//! Smoke tests for the `cokernel` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn cokernel() -> Command {
    Command::cargo_bin("cokernel").expect("binary builds")
}

#[test]
fn help_lists_the_flags() {
    cokernel()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--server-url"))
        .stdout(predicate::str::contains("--tick-ms"));
}

#[test]
fn echoes_through_the_memory_backend() {
    cokernel()
        .write_stdin("echo kernel online\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("kernel online"));
}

#[test]
fn mkdir_then_ls_shows_the_directory() {
    cokernel()
        .write_stdin("mkdir projects\nls\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("projects/"));
}

#[test]
fn failures_render_as_single_lines() {
    cokernel()
        .write_stdin("cat missing.txt\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("cat: No such file or directory"));
}
