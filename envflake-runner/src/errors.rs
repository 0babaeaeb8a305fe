// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by envflake.

use camino::{Utf8Path, Utf8PathBuf};
use config::ConfigError;
use std::{error::Error, fmt, io};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse envflake config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error that occurs while parsing an [`ExtractThreads`](crate::config::ExtractThreads) value
/// from a string.
#[derive(Clone, Debug, Error)]
#[error("invalid thread count `{input}`: {message}")]
pub struct ThreadsParseError {
    input: String,
    message: String,
}

impl ThreadsParseError {
    pub(crate) fn new(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }
}

/// The kind of artifact an error refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArtifactKind {
    /// The tabular metadata sidecar for a project-run.
    Metadata,
    /// The nested test report for a project-run.
    Report,
    /// The flat interchange artifact produced by `collect`.
    Interchange,
    /// The flaky test report produced by `classify`.
    FlakyReport,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata => write!(f, "metadata"),
            Self::Report => write!(f, "test report"),
            Self::Interchange => write!(f, "interchange"),
            Self::FlakyReport => write!(f, "flaky report"),
        }
    }
}

/// An error that caused a single project-run to be excluded from the aggregate.
///
/// These errors never abort a collect run: the project is logged and skipped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// The metadata or report artifact was not found for a project-run.
    #[error("{kind} file not found in `{project_dir}`")]
    MissingInputArtifact {
        /// The directory that was searched.
        project_dir: Utf8PathBuf,

        /// The artifact that was missing.
        kind: ArtifactKind,
    },

    /// An artifact could not be read from disk.
    #[error("failed to read {kind} file `{path}`")]
    ReadFailed {
        /// The artifact kind.
        kind: ArtifactKind,

        /// The path that could not be read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// The metadata artifact has fewer than two rows, or its fields couldn't be parsed.
    #[error("malformed metadata file `{path}`")]
    MalformedMetadata {
        /// The metadata path.
        path: Utf8PathBuf,

        /// The reason the metadata is malformed.
        #[source]
        reason: MalformedMetadataReason,
    },

    /// The report artifact is not a valid nested report.
    #[error("malformed test report `{path}`")]
    MalformedReport {
        /// The report path.
        path: Utf8PathBuf,

        /// The reason the report is malformed.
        #[source]
        reason: MalformedReportReason,
    },
}

impl ExtractError {
    /// Returns the path of the offending file, or the project directory if a file was missing.
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::MissingInputArtifact { project_dir, .. } => project_dir,
            Self::ReadFailed { path, .. }
            | Self::MalformedMetadata { path, .. }
            | Self::MalformedReport { path, .. } => path,
        }
    }
}

/// The reason a metadata artifact is malformed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MalformedMetadataReason {
    /// The artifact needs a header row and at least one data row.
    #[error("expected a header row and at least one data row, found {rows} rows")]
    TooFewRows {
        /// The number of rows found.
        rows: usize,
    },

    /// The first field of the data row is empty.
    #[error("the project name (first field of the data row) is empty")]
    EmptyProject,

    /// The artifact isn't valid CSV.
    #[error("error parsing CSV")]
    Csv(#[from] csv::Error),
}

/// The reason a report artifact is malformed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MalformedReportReason {
    /// The report isn't JSON of the expected shape.
    #[error("error parsing JSON")]
    Json(#[from] serde_json::Error),

    /// The report has neither a `tests` nor a `collectors` key.
    #[error("report has neither a `tests` nor a `collectors` key")]
    NoResultCollections,
}

/// An error that occurred while discovering project-runs under a base directory.
#[derive(Debug, Error)]
#[error("failed to read project directories under `{base_dir}`")]
pub struct DiscoveryError {
    base_dir: Utf8PathBuf,
    #[source]
    err: DiscoveryErrorKind,
}

impl DiscoveryError {
    pub(crate) fn new(base_dir: impl Into<Utf8PathBuf>, err: DiscoveryErrorKind) -> Self {
        Self {
            base_dir: base_dir.into(),
            err,
        }
    }

    /// Returns the base directory that could not be read.
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }
}

/// The kind of error that occurred during discovery.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoveryErrorKind {
    /// The base directory isn't a directory.
    #[error("not a directory")]
    NotADirectory,

    /// Walking the directory failed.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// A path isn't valid UTF-8.
    #[error(transparent)]
    NonUtf8Path(#[from] camino::FromPathBufError),
}

/// An error that occurred while reading the interchange artifact.
///
/// Classification needs the full record set, so this error aborts a classify run.
#[derive(Debug, Error)]
#[error("failed to read interchange file `{path}`")]
pub struct InterchangeReadError {
    path: Utf8PathBuf,
    #[source]
    kind: InterchangeReadErrorKind,
}

impl InterchangeReadError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, kind: InterchangeReadErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Returns the path that could not be read.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &InterchangeReadErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while reading interchange records.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InterchangeReadErrorKind {
    /// The file could not be opened.
    #[error("error opening file")]
    Open(#[source] io::Error),

    /// The header is missing required columns.
    #[error("missing required columns: {}", .columns.join(", "))]
    MissingColumns {
        /// The missing column names.
        columns: Vec<&'static str>,
    },

    /// A row could not be parsed.
    #[error("error parsing CSV")]
    Csv(#[from] csv::Error),
}

/// An error that occurred while writing an output artifact.
#[derive(Debug, Error)]
#[error("failed to write {kind} file `{path}`")]
pub struct WriteArtifactError {
    kind: ArtifactKind,
    path: Utf8PathBuf,
    #[source]
    err: WriteArtifactErrorKind,
}

impl WriteArtifactError {
    pub(crate) fn new(
        kind: ArtifactKind,
        path: impl Into<Utf8PathBuf>,
        err: atomicwrites::Error<csv::Error>,
    ) -> Self {
        let err = match err {
            atomicwrites::Error::Internal(err) => WriteArtifactErrorKind::Io(err),
            atomicwrites::Error::User(err) => WriteArtifactErrorKind::Csv(err),
        };
        Self {
            kind,
            path: path.into(),
            err,
        }
    }

    /// Returns the kind of artifact that could not be written.
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Returns the path that could not be written.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// The kind of error that occurred while writing an output artifact.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteArtifactErrorKind {
    /// Creating or persisting the file failed.
    #[error("I/O error")]
    Io(#[source] io::Error),

    /// Serializing rows failed.
    #[error("error writing CSV")]
    Csv(#[source] csv::Error),
}

/// An error that occurred while starting the extraction thread pool.
#[derive(Debug, Error)]
#[error("failed to start {threads} extraction threads")]
pub struct ExtractPoolError {
    threads: usize,
    #[source]
    err: rayon::ThreadPoolBuildError,
}

impl ExtractPoolError {
    pub(crate) fn new(threads: usize, err: rayon::ThreadPoolBuildError) -> Self {
        Self { threads, err }
    }

    /// Returns the number of threads that were requested.
    pub fn threads(&self) -> usize {
        self.threads
    }
}

/// Displays an error along with its chain of sources, one per line.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new displayer for the given error.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        while let Some(err) = source {
            write!(f, "\n  caused by: {err}")?;
            source = err.source();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_error_chain() {
        let err = ExtractError::MalformedMetadata {
            path: "run/meta.csv".into(),
            reason: MalformedMetadataReason::TooFewRows { rows: 1 },
        };
        assert_eq!(
            DisplayErrorChain::new(&err).to_string(),
            "malformed metadata file `run/meta.csv`\n  \
             caused by: expected a header row and at least one data row, found 1 rows",
        );
    }

    #[test]
    fn extract_error_path() {
        let err = ExtractError::MissingInputArtifact {
            project_dir: "runs/p1-linux".into(),
            kind: ArtifactKind::Report,
        };
        assert_eq!(err.path(), "runs/p1-linux");
        assert_eq!(err.to_string(), "test report file not found in `runs/p1-linux`");
    }
}
