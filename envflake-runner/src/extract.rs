// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction of canonical records from one project-run.
//!
//! A project-run is described by two artifacts: a tabular metadata sidecar, which names the
//! project and (usually) the environment, and a nested test report. [`extract_project`] turns
//! the pair into a sequence of [`CanonicalRecord`]s, all stamped with the same project and
//! environment.

use crate::{
    discovery::ProjectInputs,
    errors::{ArtifactKind, ExtractError, MalformedMetadataReason, MalformedReportReason},
    record::{CanonicalRecord, Environment, Outcome},
};
use camino::{Utf8Path, Utf8PathBuf};
use envflake_metadata::{ReportTest, Stage, StageData, TestReport};
use itertools::Itertools;
use std::io;
use tracing::debug;

/// The test identifier used when a report entry has no node id.
pub const UNKNOWN_TEST_NAME: &str = "<unknown>";

/// The project and environment resolved from a metadata artifact.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectInfo {
    /// The canonical project name.
    pub project: String,

    /// The environment that applies to every record of this project-run.
    pub environment: Environment,
}

impl ProjectInfo {
    /// Resolves project information from the rows of a metadata artifact.
    ///
    /// Row 0 is a header and is ignored. Row 1 is joined back together with commas; the project
    /// is its first comma-separated field and the environment its last, each trimmed. If the
    /// environment field is empty, the environment is detected from keywords in
    /// `metadata_path`.
    pub fn from_metadata_rows<S: AsRef<str>>(
        rows: &[Vec<S>],
        metadata_path: &Utf8Path,
    ) -> Result<Self, MalformedMetadataReason> {
        let Some(data_row) = rows.get(1) else {
            return Err(MalformedMetadataReason::TooFewRows { rows: rows.len() });
        };

        let line = data_row.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
        // split and rsplit always yield at least one element.
        let project = line.split(',').next().unwrap_or_default().trim();
        let environment = line.rsplit(',').next().unwrap_or_default().trim();

        if project.is_empty() {
            return Err(MalformedMetadataReason::EmptyProject);
        }

        let environment = if environment.is_empty() {
            let detected = Environment::detect(metadata_path.as_str());
            debug!("no environment in `{metadata_path}`, detected `{detected}` from its path");
            detected
        } else {
            Environment::from_raw(environment)
        };

        Ok(Self {
            project: project.to_owned(),
            environment,
        })
    }

    /// Resolves project information from a metadata artifact in CSV form.
    ///
    /// Only the first two rows are read.
    pub fn from_metadata_reader(
        reader: impl io::Read,
        metadata_path: &Utf8Path,
    ) -> Result<Self, MalformedMetadataReason> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::with_capacity(2);
        for record in csv_reader.records().take(2) {
            let record = record?;
            rows.push(record.iter().map(str::to_owned).collect::<Vec<_>>());
        }

        Self::from_metadata_rows(&rows, metadata_path)
    }

    /// Resolves project information from the metadata file at `path`.
    pub fn from_metadata_file(path: &Utf8Path) -> Result<Self, ExtractError> {
        let file = std::fs::File::open(path).map_err(|err| ExtractError::ReadFailed {
            kind: ArtifactKind::Metadata,
            path: path.to_owned(),
            err,
        })?;
        Self::from_metadata_reader(io::BufReader::new(file), path).map_err(|reason| {
            ExtractError::MalformedMetadata {
                path: path.to_owned(),
                reason,
            }
        })
    }
}

/// Parses a nested test report from JSON.
///
/// A report must be a JSON object with at least one of `tests` and `collectors`. If only one is
/// present, the other is treated as empty.
pub fn parse_report(json: &str) -> Result<TestReport, MalformedReportReason> {
    let report = TestReport::parse(json)?;
    if report.tests.is_none() && report.collectors.is_none() {
        return Err(MalformedReportReason::NoResultCollections);
    }
    Ok(report)
}

/// Converts a parsed report into canonical records for the given project.
///
/// Per-test records come first, in report order, followed by one `collection_error` record per
/// failed collector. Only the first record for each test identifier is kept, so a project-run
/// never yields two records for the same test.
pub fn extract_records(report: &TestReport, info: &ProjectInfo) -> Vec<CanonicalRecord> {
    let tests = report.tests.as_deref().unwrap_or_default();
    let collectors = report.collectors.as_deref().unwrap_or_default();

    let test_records = tests.iter().filter_map(|test| {
        let (stage, data) = first_recorded_stage(test)?;
        let test_name = test.nodeid.as_deref().unwrap_or(UNKNOWN_TEST_NAME);
        debug!("{test_name}: using {stage} stage");

        Some(CanonicalRecord {
            project: info.project.clone(),
            test_name: test_name.to_owned(),
            outcome: Outcome::from_raw(data.outcome().unwrap_or_default()),
            lineno: data.crash_lineno().or(test.lineno),
            environment: info.environment.clone(),
        })
    });

    let collector_records = collectors
        .iter()
        .filter(|collector| collector.is_failed())
        .map(|collector| CanonicalRecord {
            project: info.project.clone(),
            test_name: collector
                .nodeid
                .as_deref()
                .unwrap_or(UNKNOWN_TEST_NAME)
                .to_owned(),
            outcome: Outcome::CollectionError,
            lineno: None,
            environment: info.environment.clone(),
        });

    test_records
        .chain(collector_records)
        .unique_by(|record| record.test_name.clone())
        .collect()
}

/// Returns the first stage, in execution order, that has any recorded data.
fn first_recorded_stage(test: &ReportTest) -> Option<(Stage, &StageData)> {
    Stage::ALL.into_iter().find_map(|stage| {
        test.stage(stage)
            .filter(|data| data.is_present())
            .map(|data| (stage, data))
    })
}

/// The result of extracting one project-run.
#[derive(Clone, Debug)]
pub struct ProjectExtraction {
    /// The project-run directory.
    pub project_dir: Utf8PathBuf,

    /// The resolved project and environment.
    pub info: ProjectInfo,

    /// The extracted records, in report order.
    pub records: Vec<CanonicalRecord>,
}

/// Extracts canonical records for one project-run.
pub fn extract_project(inputs: &ProjectInputs) -> Result<ProjectExtraction, ExtractError> {
    let missing = |kind| ExtractError::MissingInputArtifact {
        project_dir: inputs.project_dir.clone(),
        kind,
    };
    let metadata_path = inputs
        .metadata
        .as_deref()
        .ok_or_else(|| missing(ArtifactKind::Metadata))?;
    let report_path = inputs
        .report
        .as_deref()
        .ok_or_else(|| missing(ArtifactKind::Report))?;

    let info = ProjectInfo::from_metadata_file(metadata_path)?;
    debug!(
        "resolved project `{}` in environment `{}` from `{metadata_path}`",
        info.project, info.environment,
    );

    let json = std::fs::read_to_string(report_path).map_err(|err| ExtractError::ReadFailed {
        kind: ArtifactKind::Report,
        path: report_path.to_owned(),
        err,
    })?;
    let report = parse_report(&json).map_err(|reason| ExtractError::MalformedReport {
        path: report_path.to_owned(),
        reason,
    })?;

    let records = extract_records(&report, &info);
    Ok(ProjectExtraction {
        project_dir: inputs.project_dir.clone(),
        info,
        records,
    })
}
