// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;

/// Returns the directory holding the sample project runs.
pub(super) fn sample_run_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crate directory has a parent")
        .join("fixtures/sample-run")
}

/// The interchange file produced from the sample runs.
///
/// `test_basic` on linux has populated setup data, so its setup outcome is the one recorded.
pub(super) const EXPECTED_INTERCHANGE: &str = "\
project,test_name,outcome,lineno,environment
alpha,tests/test_core.py::test_basic,passed,10,linux
alpha,tests/test_core.py::test_flaky,failed,24,linux
alpha,tests/test_core.py::test_setup,error,5,linux
alpha,tests/test_core.py::test_ok,passed,40,linux
alpha,tests/test_broken.py,collection_error,,linux
alpha,tests/test_core.py::test_basic,failed,12,mac
alpha,tests/test_core.py::test_ok,passed,40,mac
alpha,tests/test_broken.py,collection_error,,mac
alpha,tests/test_core.py::test_basic,failed,10,windows
alpha,tests/test_core.py::test_flaky,failed,24,windows
alpha,tests/test_core.py::test_setup,error,30,windows
alpha,tests/test_core.py::test_ok,passed,40,windows
";

/// The flaky report for [`EXPECTED_INTERCHANGE`] with every record counted as a failure.
pub(super) const EXPECTED_FLAKY_REPORT: &str = "\
project,test_name,outcome,failing_environments,passing_environments,num_failing_envs,num_passing_envs
alpha,tests/test_broken.py,collection_error,\"['linux', 'mac']\",['windows'],2,1
alpha,tests/test_core.py::test_flaky,failed,\"['linux', 'windows']\",['mac'],2,1
alpha,tests/test_core.py::test_setup,error,\"['linux', 'windows']\",['mac'],2,1
";
