// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::helpers::Styles;
use crate::{
    classify::{Classification, FlakyVerdict, Limitation},
    helpers::plural,
    record::Environment,
};
use itertools::Itertools;
use owo_colors::OwoColorize;
use std::{collections::BTreeSet, io};

const BANNER_WIDTH: usize = 80;

/// Renders a human-readable summary of a [`Classification`].
#[derive(Debug, Default)]
pub struct SummaryReporter {
    styles: Styles,
}

impl SummaryReporter {
    /// Creates a new summary reporter with styling disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables ANSI styling in the output.
    pub fn colorize(&mut self) -> &mut Self {
        self.styles.colorize();
        self
    }

    /// Writes the summary for `classification` to `writer`.
    pub fn write_summary(
        &self,
        classification: &Classification,
        mut writer: impl io::Write,
    ) -> io::Result<()> {
        let universe = classification.universe();
        writeln!(
            writer,
            "Analyzed {} {} across {} {}{}",
            classification.total_tests().style(self.styles.count),
            plural::tests_str(classification.total_tests()),
            universe.len().style(self.styles.count),
            plural::environments_str(universe.len()),
            if universe.is_empty() {
                String::new()
            } else {
                format!(" ({})", universe.iter().join(", "))
            },
        )?;
        writeln!(writer)?;

        if let Some(limitation) = classification.limitation() {
            return self.write_limitation(limitation, &mut writer);
        }

        let verdicts = classification.verdicts();
        if verdicts.is_empty() {
            writeln!(
                writer,
                "No flaky tests detected: every test fails in all observed environments."
            )?;
            return Ok(());
        }

        self.write_banner("FLAKY TESTS ANALYSIS", &mut writer)?;
        writeln!(writer)?;
        writeln!(
            writer,
            "Found {} flaky {} in {} {}",
            verdicts.len().style(self.styles.count),
            plural::tests_str(verdicts.len()),
            classification.flaky_project_count().style(self.styles.count),
            plural::projects_str(classification.flaky_project_count()),
        )?;
        writeln!(writer)?;

        // Verdicts are already sorted by project, so chunking groups them.
        for (project, project_verdicts) in &verdicts.iter().chunk_by(|&verdict| verdict.project()) {
            writeln!(writer, "PROJECT: {}", project.style(self.styles.project))?;
            writeln!(writer, "{}", "-".repeat(project.len() + "PROJECT: ".len()))?;
            for verdict in project_verdicts {
                self.write_verdict(verdict, &mut writer)?;
            }
        }

        self.write_stats(classification, &mut writer)
    }

    fn write_verdict(&self, verdict: &FlakyVerdict, mut writer: impl io::Write) -> io::Result<()> {
        writeln!(writer, "  Test: {}", verdict.test_name())?;
        writeln!(writer, "  Outcome: {}", verdict.outcome)?;
        writeln!(
            writer,
            "  Fails in: {}",
            join_environments(&verdict.failing_environments).style(self.styles.fail)
        )?;
        writeln!(
            writer,
            "  Passes in: {}",
            join_environments(&verdict.passing_environments).style(self.styles.pass)
        )?;
        writeln!(writer)
    }

    fn write_stats(
        &self,
        classification: &Classification,
        mut writer: impl io::Write,
    ) -> io::Result<()> {
        let stats = classification.stats();

        self.write_banner("SUMMARY STATISTICS", &mut writer)?;
        writeln!(
            writer,
            "Distribution of flaky tests by number of failing environments:"
        )?;
        for (env_count, test_count) in &stats.by_failing_env_count {
            writeln!(
                writer,
                "  Tests failing in {env_count} {}: {}",
                plural::environments_str(*env_count),
                test_count.style(self.styles.count),
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Distribution by outcome type:")?;
        for (outcome, count) in &stats.by_outcome {
            writeln!(writer, "  {outcome}: {}", count.style(self.styles.count))?;
        }

        Ok(())
    }

    fn write_limitation(
        &self,
        limitation: &Limitation,
        mut writer: impl io::Write,
    ) -> io::Result<()> {
        match limitation {
            Limitation::EmptyInput => {
                writeln!(
                    writer,
                    "{}: the input has no records",
                    "No flaky tests detected".style(self.styles.skip)
                )
            }
            Limitation::SingleEnvironment(env) => {
                writeln!(
                    writer,
                    "{}: only one environment ({env}) was observed, \
                     so flakiness across environments cannot be determined",
                    "No flaky tests detected".style(self.styles.skip)
                )
            }
        }
    }

    fn write_banner(&self, title: &str, mut writer: impl io::Write) -> io::Result<()> {
        let rule = "=".repeat(BANNER_WIDTH);
        writeln!(writer, "{rule}")?;
        writeln!(writer, "{}", title.style(self.styles.heading))?;
        writeln!(writer, "{rule}")
    }
}

fn join_environments(environments: &BTreeSet<Environment>) -> String {
    environments.iter().join(", ")
}
