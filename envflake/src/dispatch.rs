// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use envflake_metadata::EnvflakeExitCode;
use envflake_runner::{
    classify::{Classification, ClassifyOptions, classify},
    collect::{CollectOutcome, Collector},
    config::{EnvflakeConfig, ExtractThreads},
    discovery::discover_projects,
    interchange::{read_interchange, write_interchange},
    record::{CanonicalRecord, Outcome},
    reporter::{CollectReporter, SummaryReporter, write_flaky_report},
};
use std::io::Write;
use tracing::info;

/// Find tests that fail in some operating-system environments but not others.
///
/// Each subdirectory of a base directory holds one run of one project in one environment: a CSV
/// metadata file and a JSON test report. `envflake` aggregates these runs and reports tests whose
/// failures depend on the environment.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct EnvflakeApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(subcommand)]
    command: Command,
}

impl EnvflakeApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the exit code on success.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let cwd = current_dir()?;
        let config = self.config_opts.make_config(&cwd)?;

        match self.command {
            Command::Collect {
                base_dir,
                collect_opts,
            } => {
                collect_opts.exec(&base_dir, &config, output, output_writer)?;
                Ok(EnvflakeExitCode::OK)
            }
            Command::Classify {
                input,
                classify_opts,
            } => {
                let input = input.unwrap_or_else(|| config.store().interchange.clone());
                let records = read_interchange(&input)?;
                info!("loaded {} records from `{input}`", records.len());
                classify_opts.exec(&records, &config, output, output_writer)
            }
            Command::Run {
                base_dir,
                collect_opts,
                classify_opts,
            } => {
                let outcome = collect_opts.exec(&base_dir, &config, output, output_writer)?;
                classify_opts.exec(&outcome.records, &config, output, output_writer)
            }
        }
    }
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Config file [default: current-dir/.config/envflake.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self, root: &Utf8Path) -> Result<EnvflakeConfig> {
        Ok(EnvflakeConfig::from_sources(
            root,
            self.config_file.as_deref(),
        )?)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Aggregate per-environment test reports into an interchange file
    ///
    /// Project runs that can't be read are reported and skipped.
    Collect {
        /// Directory containing one subdirectory per project run
        base_dir: Utf8PathBuf,

        #[command(flatten)]
        collect_opts: CollectOpts,
    },

    /// Classify tests in an interchange file as flaky across environments
    Classify {
        /// Interchange file [default: the `store.interchange` config value]
        input: Option<Utf8PathBuf>,

        #[command(flatten)]
        classify_opts: ClassifyOpts,
    },

    /// Collect and classify in one step
    Run {
        /// Directory containing one subdirectory per project run
        base_dir: Utf8PathBuf,

        #[command(flatten)]
        collect_opts: CollectOpts,

        #[command(flatten)]
        classify_opts: ClassifyOpts,
    },
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Collect options")]
struct CollectOpts {
    /// Interchange file to write [default: BASE_DIR/final_all.csv]
    #[arg(long, short, value_name = "PATH")]
    output: Option<Utf8PathBuf>,

    /// Number of project runs to extract in parallel
    #[arg(long, short = 'j', value_name = "THREADS", env = "ENVFLAKE_THREADS")]
    threads: Option<ExtractThreads>,
}

impl CollectOpts {
    fn exec(
        &self,
        base_dir: &Utf8Path,
        config: &EnvflakeConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<CollectOutcome> {
        let projects = discover_projects(base_dir, config.discovery())?;
        info!(
            "found {} project runs under `{base_dir}`",
            projects.len()
        );

        let mut collect_config = *config.collect();
        if let Some(threads) = self.threads {
            collect_config.threads = threads;
        }
        let outcome = Collector::new(&collect_config).collect(&projects)?;

        let output_path = self
            .output
            .clone()
            .unwrap_or_else(|| base_dir.join(&config.store().interchange));
        write_interchange(&output_path, &outcome.records)?;

        let mut reporter = CollectReporter::new();
        if output.colorize_stdout() {
            reporter.colorize();
        }
        let mut writer = output_writer.stdout_writer();
        reporter
            .write_summary(&outcome, Some(&output_path), &mut writer)
            .and_then(|()| writer.flush())
            .map_err(ExpectedError::write_output_error)?;

        Ok(outcome)
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Classify options")]
struct ClassifyOpts {
    /// Flaky report file to write [default: the `store.flaky-report` config value]
    #[arg(long, value_name = "PATH", conflicts_with = "no_report")]
    report_output: Option<Utf8PathBuf>,

    /// Don't write a flaky report file
    #[arg(long)]
    no_report: bool,

    /// Only count records with this outcome as failures (can be repeated)
    ///
    /// Overrides `classify.failure-outcomes` in the config. By default, every record counts.
    #[arg(long = "failure-outcome", value_name = "OUTCOME")]
    failure_outcomes: Vec<String>,

    /// Exit with a non-zero code if any flaky tests are found
    #[arg(long)]
    fail_on_flaky: bool,
}

impl ClassifyOpts {
    fn exec(
        &self,
        records: &[CanonicalRecord],
        config: &EnvflakeConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let classification = classify(records, &self.classify_options(config));

        let mut reporter = SummaryReporter::new();
        if output.colorize_stdout() {
            reporter.colorize();
        }
        let mut writer = output_writer.stdout_writer();
        reporter
            .write_summary(&classification, &mut writer)
            .and_then(|()| writer.flush())
            .map_err(ExpectedError::write_output_error)?;

        let report_path = self.write_report(&classification, config)?;

        let flaky_count = classification.verdicts().len();
        if self.fail_on_flaky && flaky_count > 0 {
            return Err(ExpectedError::flaky_tests_found(flaky_count, report_path));
        }
        Ok(EnvflakeExitCode::OK)
    }

    fn classify_options(&self, config: &EnvflakeConfig) -> ClassifyOptions {
        if self.failure_outcomes.is_empty() {
            config.classify_options()
        } else {
            ClassifyOptions {
                failure_outcomes: Some(
                    self.failure_outcomes
                        .iter()
                        .map(|raw| Outcome::from_raw(raw))
                        .collect(),
                ),
            }
        }
    }

    fn write_report(
        &self,
        classification: &Classification,
        config: &EnvflakeConfig,
    ) -> Result<Option<Utf8PathBuf>> {
        if self.no_report {
            return Ok(None);
        }
        let path = self
            .report_output
            .clone()
            .unwrap_or_else(|| config.store().flaky_report.clone());
        write_flaky_report(&path, classification)?;
        info!("flaky test report saved to `{path}`");
        Ok(Some(path))
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(ExpectedError::current_dir_invalid)?;
    Utf8PathBuf::try_from(cwd)
        .map_err(|err| ExpectedError::current_dir_invalid_utf8(err.into_path_buf()))
}
