// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests that drive the CLI in-process against the `fixtures/sample-run` tree.

use crate::{EnvflakeApp, ExpectedError, OutputWriter};
use camino::Utf8PathBuf;
use camino_tempfile::Utf8TempDir;
use clap::Parser;
use envflake_metadata::EnvflakeExitCode;
use indoc::indoc;
use pretty_assertions::assert_eq;

mod fixtures;

use fixtures::*;

fn exec(args: &[&str]) -> (Result<i32, ExpectedError>, OutputWriter) {
    let app = EnvflakeApp::parse_from(
        ["envflake", "--color", "never"]
            .iter()
            .chain(args)
            .copied(),
    );
    let output = app.init_output();
    let mut writer = OutputWriter::new_test();
    let result = app.exec(output, &mut writer);
    (result, writer)
}

#[test]
fn collect_writes_interchange() {
    let temp = Utf8TempDir::new().unwrap();
    let interchange = temp.path().join("final_all.csv");
    let base = sample_run_dir();

    let (result, writer) = exec(&["collect", base.as_str(), "-o", interchange.as_str(), "-j", "2"]);
    assert_eq!(result.unwrap(), EnvflakeExitCode::OK);

    assert_eq!(
        std::fs::read_to_string(&interchange).unwrap(),
        EXPECTED_INTERCHANGE
    );
    assert_eq!(
        writer.stdout().unwrap(),
        format!(
            "EXTRACTED alpha (linux): 5 records\n\
             EXTRACTED alpha (mac): 3 records\n\
             EXTRACTED alpha (windows): 4 records\n\
             \x20\x20SKIPPED {beta}: metadata file not found in `{beta}`\n\
             Wrote 12 records to {interchange}\n\
             3 projects processed, 1 skipped\n",
            beta = base.join("beta-linux"),
        )
    );
}

#[test]
fn classify_reads_interchange() {
    let temp = Utf8TempDir::new().unwrap();
    let interchange = temp.path().join("final_all.csv");
    let report = temp.path().join("flaky.csv");
    std::fs::write(&interchange, EXPECTED_INTERCHANGE).unwrap();

    let (result, writer) = exec(&[
        "classify",
        interchange.as_str(),
        "--report-output",
        report.as_str(),
    ]);
    assert_eq!(result.unwrap(), EnvflakeExitCode::OK);
    assert_eq!(std::fs::read_to_string(&report).unwrap(), EXPECTED_FLAKY_REPORT);

    let stdout = writer.stdout().unwrap();
    assert!(
        stdout.starts_with("Analyzed 5 tests across 3 environments (linux, mac, windows)\n"),
        "unexpected stdout: {stdout}"
    );
    assert!(stdout.contains("Found 3 flaky tests in 1 project\n"));
    assert!(
        stdout.contains(
            "  Test: tests/test_core.py::test_setup\n  \
             Outcome: error\n  \
             Fails in: linux, windows\n  \
             Passes in: mac\n"
        ),
        "unexpected stdout: {stdout}"
    );
}

#[test]
fn run_collects_and_classifies() {
    let temp = Utf8TempDir::new().unwrap();
    let interchange = temp.path().join("final_all.csv");
    let report = temp.path().join("flaky.csv");

    let (result, _) = exec(&[
        "run",
        sample_run_dir().as_str(),
        "-o",
        interchange.as_str(),
        "--report-output",
        report.as_str(),
    ]);
    assert_eq!(result.unwrap(), EnvflakeExitCode::OK);
    assert_eq!(
        std::fs::read_to_string(&interchange).unwrap(),
        EXPECTED_INTERCHANGE
    );
    assert_eq!(std::fs::read_to_string(&report).unwrap(), EXPECTED_FLAKY_REPORT);
}

#[test]
fn failure_outcome_filter() {
    let temp = Utf8TempDir::new().unwrap();
    let interchange = temp.path().join("final_all.csv");
    let report = temp.path().join("flaky.csv");
    std::fs::write(&interchange, EXPECTED_INTERCHANGE).unwrap();

    let (result, _) = exec(&[
        "classify",
        interchange.as_str(),
        "--report-output",
        report.as_str(),
        "--failure-outcome",
        "failed",
        "--failure-outcome",
        "error",
        "--failure-outcome",
        "collection_error",
    ]);
    assert_eq!(result.unwrap(), EnvflakeExitCode::OK);

    // test_basic only counts as failing on mac and windows once passed records are ignored.
    assert_eq!(
        std::fs::read_to_string(&report).unwrap(),
        indoc! {r#"
            project,test_name,outcome,failing_environments,passing_environments,num_failing_envs,num_passing_envs
            alpha,tests/test_broken.py,collection_error,"['linux', 'mac']",['windows'],2,1
            alpha,tests/test_core.py::test_basic,failed,"['mac', 'windows']",['linux'],2,1
            alpha,tests/test_core.py::test_flaky,failed,"['linux', 'windows']",['mac'],2,1
            alpha,tests/test_core.py::test_setup,error,"['linux', 'windows']",['mac'],2,1
        "#}
    );
}

#[test]
fn fail_on_flaky() {
    let temp = Utf8TempDir::new().unwrap();
    let interchange = temp.path().join("final_all.csv");
    std::fs::write(&interchange, EXPECTED_INTERCHANGE).unwrap();

    let (result, _) = exec(&["classify", interchange.as_str(), "--no-report", "--fail-on-flaky"]);
    let err = result.unwrap_err();
    assert!(
        matches!(err, ExpectedError::FlakyTestsFound { count: 3, report: None }),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.process_exit_code(), EnvflakeExitCode::FLAKY_TESTS_FOUND);
}

#[test]
fn single_environment_is_not_flaky() {
    let temp = Utf8TempDir::new().unwrap();
    let interchange = temp.path().join("final_all.csv");
    let report = temp.path().join("flaky.csv");
    std::fs::write(
        &interchange,
        indoc! {"
            project,test_name,outcome,lineno,environment
            alpha,t1,failed,3,linux
            alpha,t2,passed,,linux
        "},
    )
    .unwrap();

    let (result, writer) = exec(&[
        "classify",
        interchange.as_str(),
        "--report-output",
        report.as_str(),
        "--fail-on-flaky",
    ]);
    assert_eq!(result.unwrap(), EnvflakeExitCode::OK);
    assert!(
        writer
            .stdout()
            .unwrap()
            .contains("only one environment (linux) was observed")
    );
    assert_eq!(
        std::fs::read_to_string(&report).unwrap(),
        "project,test_name,outcome,failing_environments,passing_environments,\
         num_failing_envs,num_passing_envs\n"
    );
}

#[test]
fn missing_interchange_aborts() {
    let temp = Utf8TempDir::new().unwrap();
    let missing = temp.path().join("final_all.csv");

    let (result, _) = exec(&["classify", missing.as_str(), "--no-report"]);
    let err = result.unwrap_err();
    assert_eq!(
        err.process_exit_code(),
        EnvflakeExitCode::INTERCHANGE_READ_FAILED
    );
}

#[test]
fn missing_base_dir() {
    let temp = Utf8TempDir::new().unwrap();
    let missing: Utf8PathBuf = temp.path().join("runs");

    let (result, _) = exec(&["collect", missing.as_str()]);
    let err = result.unwrap_err();
    assert_eq!(err.process_exit_code(), EnvflakeExitCode::DISCOVERY_FAILED);
}

#[test]
fn invalid_config_file() {
    let temp = Utf8TempDir::new().unwrap();
    let config = temp.path().join("envflake.toml");
    std::fs::write(&config, "[collect]\nthreads = 0\n").unwrap();
    let interchange = temp.path().join("final_all.csv");
    std::fs::write(&interchange, EXPECTED_INTERCHANGE).unwrap();

    let (result, _) = exec(&[
        "--config-file",
        config.as_str(),
        "classify",
        interchange.as_str(),
        "--no-report",
    ]);
    let err = result.unwrap_err();
    assert_eq!(err.process_exit_code(), EnvflakeExitCode::SETUP_ERROR);
}
