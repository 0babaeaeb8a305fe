// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs extraction over every discovered project-run and merges the results.

use crate::{
    config::CollectConfig,
    discovery::ProjectInputs,
    errors::{DisplayErrorChain, ExtractError, ExtractPoolError},
    extract::{extract_project, ProjectExtraction},
    record::{CanonicalRecord, Environment},
};
use camino::Utf8PathBuf;
use rayon::{prelude::*, ThreadPoolBuilder};
use tracing::{debug, info, warn};

/// Extracts records from project-runs in parallel.
#[derive(Clone, Debug)]
pub struct Collector {
    threads: usize,
}

impl Collector {
    /// Creates a new collector with the thread count from `config`.
    pub fn new(config: &CollectConfig) -> Self {
        Self {
            threads: config.threads.compute(),
        }
    }

    /// Returns the number of threads used to extract `project_count` project-runs.
    ///
    /// This never exceeds the number of project-runs, and is always at least 1.
    pub fn threads_for(&self, project_count: usize) -> usize {
        self.threads.min(project_count).max(1)
    }

    /// Extracts every project-run in `projects`.
    ///
    /// A project-run that fails to extract is logged and skipped. Records are returned in
    /// `projects` order, and within a project in report order.
    pub fn collect(
        &self,
        projects: &[ProjectInputs],
    ) -> Result<CollectOutcome, ExtractPoolError> {
        let threads = self.threads_for(projects.len());
        debug!("extracting {} project-runs with {threads} threads", projects.len());
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("envflake-extract-{idx}"))
            .build()
            .map_err(|err| ExtractPoolError::new(threads, err))?;

        let results: Vec<Result<ProjectExtraction, ExtractError>> =
            pool.install(|| projects.par_iter().map(extract_project).collect());

        let mut outcome = CollectOutcome::default();
        for (inputs, result) in projects.iter().zip(results) {
            match result {
                Ok(extraction) => {
                    info!(
                        "extracted {} records for project `{}` ({}) from `{}`",
                        extraction.records.len(),
                        extraction.info.project,
                        extraction.info.environment,
                        extraction.project_dir,
                    );
                    outcome.processed.push(ProcessedProject {
                        project_dir: extraction.project_dir,
                        project: extraction.info.project,
                        environment: extraction.info.environment,
                        record_count: extraction.records.len(),
                    });
                    outcome.records.extend(extraction.records);
                }
                Err(error) => {
                    warn!(
                        "skipping `{}`: {}",
                        inputs.project_dir,
                        DisplayErrorChain::new(&error),
                    );
                    outcome.skipped.push(SkippedProject {
                        project_dir: inputs.project_dir.clone(),
                        error,
                    });
                }
            }
        }

        Ok(outcome)
    }
}

/// The merged result of a collect run.
#[derive(Debug, Default)]
pub struct CollectOutcome {
    /// All extracted records.
    pub records: Vec<CanonicalRecord>,

    /// The project-runs that were extracted.
    pub processed: Vec<ProcessedProject>,

    /// The project-runs that were skipped.
    pub skipped: Vec<SkippedProject>,
}

/// A project-run that was extracted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessedProject {
    /// The project-run directory.
    pub project_dir: Utf8PathBuf,

    /// The resolved project name.
    pub project: String,

    /// The resolved environment.
    pub environment: Environment,

    /// The number of records extracted.
    pub record_count: usize,
}

/// A project-run that was excluded from the aggregate.
#[derive(Debug)]
pub struct SkippedProject {
    /// The project-run directory.
    pub project_dir: Utf8PathBuf,

    /// Why the project-run was skipped.
    pub error: ExtractError,
}
