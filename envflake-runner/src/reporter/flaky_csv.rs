// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    classify::{Classification, FlakyVerdict},
    errors::{ArtifactKind, WriteArtifactError},
    record::Environment,
};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::Utf8Path;
use std::{collections::BTreeSet, io};
use swrite::{swrite, SWrite};
use tracing::debug;

/// The columns of the flaky report, in order.
pub const FLAKY_REPORT_COLUMNS: [&str; 7] = [
    "project",
    "test_name",
    "outcome",
    "failing_environments",
    "passing_environments",
    "num_failing_envs",
    "num_passing_envs",
];

/// Writes the flaky report for `classification` to `path`, replacing any existing file atomically.
///
/// The header is written even if there are no flaky tests.
pub fn write_flaky_report(
    path: &Utf8Path,
    classification: &Classification,
) -> Result<(), WriteArtifactError> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|file| write_flaky_report_to(file, classification))
        .map_err(|err| WriteArtifactError::new(ArtifactKind::FlakyReport, path, err))?;

    debug!(
        "wrote {} flaky tests to `{path}`",
        classification.verdicts().len()
    );
    Ok(())
}

/// Writes the flaky report for `classification` as CSV to `writer`.
pub fn write_flaky_report_to<W: io::Write>(
    writer: W,
    classification: &Classification,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(FLAKY_REPORT_COLUMNS)?;
    for verdict in classification.verdicts() {
        writer.write_record(verdict_row(verdict))?;
    }
    writer.flush()?;
    Ok(())
}

fn verdict_row(verdict: &FlakyVerdict) -> [String; 7] {
    [
        verdict.project().to_owned(),
        verdict.test_name().to_owned(),
        verdict.outcome.to_string(),
        environment_list(&verdict.failing_environments),
        environment_list(&verdict.passing_environments),
        verdict.failing_environments.len().to_string(),
        verdict.passing_environments.len().to_string(),
    ]
}

/// Renders a set of environments as a sorted, bracketed, quoted list: `['linux', 'mac']`.
pub fn environment_list(environments: &BTreeSet<Environment>) -> String {
    let mut out = String::from("[");
    for (idx, env) in environments.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        swrite!(out, "'{env}'");
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classify::{classify, ClassifyOptions},
        record::{CanonicalRecord, Outcome},
    };
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use maplit::btreeset;
    use pretty_assertions::assert_eq;

    fn record(test: &str, outcome: Outcome, env: Environment) -> CanonicalRecord {
        CanonicalRecord {
            project: "p1".to_owned(),
            test_name: test.to_owned(),
            outcome,
            lineno: None,
            environment: env,
        }
    }

    #[test]
    fn environment_list_format() {
        assert_eq!(environment_list(&BTreeSet::new()), "[]");
        assert_eq!(
            environment_list(&btreeset! {Environment::Windows, Environment::Linux}),
            "['linux', 'windows']"
        );
    }

    #[test]
    fn report_rows() {
        let records = vec![
            record("t1", Outcome::Failed, Environment::Linux),
            record("t1", Outcome::Failed, Environment::Mac),
            record("t2", Outcome::Errored, Environment::Windows),
            record("t3", Outcome::Failed, Environment::Linux),
            record("t3", Outcome::Failed, Environment::Mac),
            record("t3", Outcome::Failed, Environment::Windows),
        ];
        let classification = classify(&records, &ClassifyOptions::default());

        let mut out = Vec::new();
        write_flaky_report_to(&mut out, &classification).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            indoc! {r#"
                project,test_name,outcome,failing_environments,passing_environments,num_failing_envs,num_passing_envs
                p1,t1,failed,"['linux', 'mac']",['windows'],2,1
                p1,t2,error,['windows'],"['linux', 'mac']",1,2
            "#}
        );
    }

    #[test]
    fn empty_report_has_header() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("flaky_tests_report.csv");
        let classification = classify(&[], &ClassifyOptions::default());

        write_flaky_report(&path, &classification).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "project,test_name,outcome,failing_environments,passing_environments,\
             num_failing_envs,num_passing_envs\n"
        );
    }
}
