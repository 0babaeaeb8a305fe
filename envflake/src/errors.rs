// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use envflake_metadata::EnvflakeExitCode;
use envflake_runner::errors::{
    ConfigParseError, DiscoveryError, ExtractPoolError, InterchangeReadError, WriteArtifactError,
};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholder messages: errors are meant to be printed with
// display_to_stderr, which colorizes them.

/// An expected failure: bad input or configuration, not a bug in envflake.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("current directory is invalid")]
    CurrentDirInvalid {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: std::path::PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("discovery error")]
    DiscoveryError {
        #[from]
        err: DiscoveryError,
    },
    #[error("extract pool error")]
    ExtractPoolError {
        #[from]
        err: ExtractPoolError,
    },
    #[error("interchange read error")]
    InterchangeReadError {
        #[from]
        err: InterchangeReadError,
    },
    #[error("write artifact error")]
    WriteArtifactError {
        #[from]
        err: WriteArtifactError,
    },
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
    #[error("flaky tests found")]
    FlakyTestsFound { count: usize, report: Option<Utf8PathBuf> },
}

impl ExpectedError {
    pub(crate) fn current_dir_invalid(err: std::io::Error) -> Self {
        Self::CurrentDirInvalid { err }
    }

    pub(crate) fn current_dir_invalid_utf8(path: std::path::PathBuf) -> Self {
        Self::CurrentDirInvalidUtf8 { path }
    }

    pub(crate) fn write_output_error(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    pub(crate) fn flaky_tests_found(count: usize, report: Option<Utf8PathBuf>) -> Self {
        Self::FlakyTestsFound { count, report }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirInvalid { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::ExtractPoolError { .. } => EnvflakeExitCode::SETUP_ERROR,
            Self::DiscoveryError { .. } => EnvflakeExitCode::DISCOVERY_FAILED,
            Self::InterchangeReadError { .. } => EnvflakeExitCode::INTERCHANGE_READ_FAILED,
            Self::WriteArtifactError { .. } | Self::WriteOutputError { .. } => {
                EnvflakeExitCode::WRITE_OUTPUT_ERROR
            }
            Self::FlakyTestsFound { .. } => EnvflakeExitCode::FLAKY_TESTS_FOUND,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirInvalid { err } => {
                tracing::error!("could not read the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                tracing::error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                tracing::error!(
                    "failed to parse envflake config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::DiscoveryError { err } => {
                tracing::error!(
                    "failed to read project runs under `{}`",
                    err.base_dir().style(styles.bold)
                );
                err.source()
            }
            Self::ExtractPoolError { err } => {
                tracing::error!(
                    "failed to start {} extraction threads",
                    err.threads().style(styles.bold)
                );
                err.source()
            }
            Self::InterchangeReadError { err } => {
                tracing::error!(
                    "failed to read interchange file `{}`, aborting classification",
                    err.path().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::WriteArtifactError { err } => {
                tracing::error!(
                    "failed to write {} file `{}`",
                    err.kind(),
                    err.path().style(styles.bold)
                );
                err.source()
            }
            Self::WriteOutputError { err } => {
                tracing::error!("error writing output");
                Some(err as &dyn Error)
            }
            Self::FlakyTestsFound { count, report } => {
                let tests = if *count == 1 { "test" } else { "tests" };
                match report {
                    Some(report) => tracing::error!(
                        "found {} flaky {tests} (see `{}`)",
                        count.style(styles.bold),
                        report.style(styles.bold),
                    ),
                    None => tracing::error!("found {} flaky {tests}", count.style(styles.bold)),
                }
                None
            }
        };

        while let Some(err) = next_error {
            tracing::error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
