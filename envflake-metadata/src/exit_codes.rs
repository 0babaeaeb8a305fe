// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `envflake` failures.
///
/// `envflake` runs may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum EnvflakeExitCode {}

impl EnvflakeExitCode {
    /// No errors occurred and envflake exited normally.
    pub const OK: i32 = 0;

    /// One or more flaky tests were found and `--fail-on-flaky` was passed.
    pub const FLAKY_TESTS_FOUND: i32 = 100;

    /// The base directory containing project runs could not be read.
    pub const DISCOVERY_FAILED: i32 = 102;

    /// The interchange artifact could not be opened or parsed, so classification was aborted.
    pub const INTERCHANGE_READ_FAILED: i32 = 104;

    /// A user issue happened while setting up an envflake invocation, for example an invalid
    /// configuration file.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing the interchange artifact, the flaky report, or data to stdout or stderr produced
    /// an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
