// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::helpers::Styles;
use crate::{
    collect::CollectOutcome,
    errors::DisplayErrorChain,
    helpers::plural,
};
use camino::Utf8Path;
use owo_colors::OwoColorize;
use std::io;

/// Renders the result of a collect run.
#[derive(Debug, Default)]
pub struct CollectReporter {
    styles: Styles,
}

impl CollectReporter {
    /// Creates a new collect reporter with styling disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables ANSI styling in the output.
    pub fn colorize(&mut self) -> &mut Self {
        self.styles.colorize();
        self
    }

    /// Writes one line per project-run, then the processed and skipped totals.
    ///
    /// `output` is the interchange artifact the records were written to, if any.
    pub fn write_summary(
        &self,
        outcome: &CollectOutcome,
        output: Option<&Utf8Path>,
        mut writer: impl io::Write,
    ) -> io::Result<()> {
        for project in &outcome.processed {
            writeln!(
                writer,
                "{:>9} {} ({}): {} {}",
                "EXTRACTED".style(self.styles.pass),
                project.project.style(self.styles.project),
                project.environment,
                project.record_count.style(self.styles.count),
                plural::records_str(project.record_count),
            )?;
        }
        for skipped in &outcome.skipped {
            writeln!(
                writer,
                "{:>9} {}: {}",
                "SKIPPED".style(self.styles.skip),
                skipped.project_dir,
                DisplayErrorChain::new(&skipped.error),
            )?;
        }

        if let Some(output) = output {
            writeln!(
                writer,
                "Wrote {} {} to {output}",
                outcome.records.len().style(self.styles.count),
                plural::records_str(outcome.records.len()),
            )?;
        }

        let processed = outcome.processed.len();
        let skipped = outcome.skipped.len();
        let skipped_style = if skipped > 0 {
            self.styles.fail
        } else {
            self.styles.count
        };
        writeln!(
            writer,
            "{} {} processed, {} skipped",
            processed.style(self.styles.count),
            plural::projects_str(processed),
            skipped.style(skipped_style),
        )
    }
}
