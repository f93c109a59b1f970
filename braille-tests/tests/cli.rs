//! CLI integration tests

mod common;

use assert_cmd::Command;
use common::Workspace;
use predicates::prelude::*;

fn runner(ws: &Workspace) -> Command {
    let mut cmd = Command::cargo_bin("braille-tests").unwrap();
    cmd.arg("--fixtures").arg(&ws.fixtures).arg("--no-color");
    cmd
}

#[test]
fn test_help_output() {
    let mut cmd = Command::cargo_bin("braille-tests").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("test"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_validate_clean_fixtures() {
    let ws = Workspace::new();
    ws.fixture("greeting", "1", &["text"], "hallo\n", ",hallo\n");
    ws.fixture("numbers", "2", &["numbers"], "12\n", "#ab\n");

    runner(&ws).arg("validate").assert().success().stdout(predicate::str::is_empty());

    runner(&ws)
        .args(["--no-pretty-print", "validate", "-v"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"T2B\s+\| 2").unwrap())
        .stdout(predicate::str::contains("Tag 'numbers'"));
}

#[test]
fn test_validate_reports_bad_fixture() {
    let ws = Workspace::new();
    ws.fixture("greeting", "1", &["text"], "hallo\n", ",hallo\n");
    ws.raw_fixture(
        "broken",
        r#"{"name": "broken", "desc": "", "level": "1", "tags": ["text", "text"]}"#,
        "hallo\n",
        ",hallo\n",
    );

    runner(&ws)
        .arg("validate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("broken"))
        .stdout(predicate::str::contains("Duplicate tags: text"));
}

#[test]
fn test_list_is_lenient() {
    let ws = Workspace::new();
    ws.fixture("greeting", "1", &["text"], "hallo\n", ",hallo\n");
    ws.raw_fixture("draft", r#"{"name": "draft", "level": "9", "tags": []}"#, "", "");

    runner(&ws)
        .args(["--no-pretty-print", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("greeting"))
        .stdout(predicate::str::contains("draft"));
}

#[test]
fn test_missing_project_dir() {
    let ws = Workspace::new();
    ws.fixture("greeting", "1", &["text"], "hallo\n", ",hallo\n");

    runner(&ws)
        .args(["test", "/definitely/not/a/project", "--quiet"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Project directory not found"));
}

#[test]
fn test_missing_fixture_root() {
    let ws = Workspace::new();
    let mut cmd = Command::cargo_bin("braille-tests").unwrap();
    cmd.arg("--fixtures").arg(ws.fixtures.join("nope")).arg("validate");
    cmd.assert().code(1).stderr(predicate::str::contains("Fixture directory not found"));
}

#[test]
fn test_fixture_root_found_from_subdirectory() {
    let ws = Workspace::with_fixture_root("RW214-project-testcases/testcases");
    ws.fixture("greeting", "1", &["text"], "hallo\n", ",hallo\n");
    let nested = ws.root().join("RW214-project-testcases").join("scripts");
    std::fs::create_dir_all(&nested).unwrap();

    let mut cmd = Command::cargo_bin("braille-tests").unwrap();
    cmd.current_dir(&nested).args(["--no-color", "--no-pretty-print", "validate", "-v"]);
    cmd.assert().success().stdout(predicate::str::is_match(r"T2B\s+\| 1").unwrap());
}

#[test]
fn test_fixture_root_not_found() {
    let ws = Workspace::new();
    let mut cmd = Command::cargo_bin("braille-tests").unwrap();
    cmd.current_dir(&ws.project).arg("validate");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Could not find the 'RW214-project-testcases' directory"));
}

#[cfg(unix)]
#[test]
fn test_run_all_passing() {
    let ws = Workspace::new();
    ws.fixture("greeting", "1", &["text"], "hallo\n", ",hallo\n");

    runner(&ws)
        .arg("test")
        .arg(&ws.project)
        .args(["--launcher", common::LAUNCHER, "--quiet", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"PASSED\""));
}

#[cfg(unix)]
#[test]
fn test_run_with_failure_exits_nonzero() {
    let ws = Workspace::new();
    ws.fixture("greeting", "1", &["text"], "hallo\n", ",hallo\n");
    ws.fixture("wrong", "1", &["text"], "hallo\n", ",hello\n");

    runner(&ws)
        .arg("test")
        .arg(&ws.project)
        .args(["--launcher", common::LAUNCHER, "--quiet", "--format", "report", "--details"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "2 fixtures run, 1 passed, 1 failed, 0 ended with an error.",
        ))
        .stdout(predicate::str::contains("wrong: FAILED"));
}
