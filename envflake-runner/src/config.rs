// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for envflake.
//!
//! The config is layered: the embedded [default config](EnvflakeConfig::DEFAULT_CONFIG) is the
//! base, and a repository config file is layered on top of it.

use crate::{
    classify::ClassifyOptions,
    errors::{ConfigParseError, ConfigParseErrorKind, ThreadsParseError},
    record::Outcome,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, File, FileFormat};
use itertools::Itertools;
use serde::Deserialize;
use std::{cmp::Ordering, collections::BTreeSet, fmt, str::FromStr};
use tracing::warn;

/// Overall configuration for envflake.
#[derive(Clone, Debug)]
pub struct EnvflakeConfig {
    store: StoreConfig,
    discovery: DiscoveryConfig,
    collect: CollectConfig,
    classify: ClassifyConfig,
}

impl EnvflakeConfig {
    /// The location of the repository config, relative to the directory envflake is run from.
    pub const CONFIG_PATH: &'static str = ".config/envflake.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from `config_file` if specified, otherwise from
    /// [`CONFIG_PATH`](Self::CONFIG_PATH) under `root` if it exists.
    ///
    /// Unknown keys are reported as warnings.
    pub fn from_sources(
        root: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (config, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        if !unknown.is_empty() {
            warn!(
                "ignoring unknown configuration keys in `{config_file}`: {}",
                unknown.iter().join(", "),
            );
        }

        Ok(config.into_config())
    }

    /// Returns the default config.
    pub fn default_config() -> Self {
        let (config, unknown) = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid");
        debug_assert!(
            unknown.is_empty(),
            "found unknown keys in default config: {unknown:?}"
        );
        config.into_config()
    }

    /// Returns the artifact locations.
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    /// Returns the discovery config.
    pub fn discovery(&self) -> &DiscoveryConfig {
        &self.discovery
    }

    /// Returns the collect config.
    pub fn collect(&self) -> &CollectConfig {
        &self.collect
    }

    /// Returns the classification options.
    pub fn classify_options(&self) -> ClassifyOptions {
        ClassifyOptions {
            failure_outcomes: self.classify.failure_outcomes.clone(),
        }
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(ConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: ConfigDeserialize =
            serde_path_to_error::deserialize(ignored_de).map_err(|error| {
                // serde_path_to_error already reports the key, so drop it from the config error.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

impl Default for EnvflakeConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Locations of the artifacts envflake writes and reads.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct StoreConfig {
    /// The interchange file name.
    pub interchange: Utf8PathBuf,

    /// The flaky report file name.
    pub flaky_report: Utf8PathBuf,
}

/// How project-run artifacts are found.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct DiscoveryConfig {
    /// The extension of metadata files, without the leading dot.
    pub metadata_extension: String,

    /// The extension of report files, without the leading dot.
    pub report_extension: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            metadata_extension: "csv".to_owned(),
            report_extension: "json".to_owned(),
        }
    }
}

/// Settings for the collect stage.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CollectConfig {
    /// The number of extraction threads.
    pub threads: ExtractThreads,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClassifyConfig {
    #[serde(default)]
    failure_outcomes: Option<BTreeSet<Outcome>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigDeserialize {
    store: StoreConfig,
    discovery: DiscoveryConfig,
    collect: CollectConfig,
    // The default config only has comments under [classify].
    #[serde(default)]
    classify: ClassifyConfig,
}

impl ConfigDeserialize {
    fn into_config(self) -> EnvflakeConfig {
        EnvflakeConfig {
            store: self.store,
            discovery: self.discovery,
            collect: self.collect,
            classify: self.classify,
        }
    }
}

/// The number of threads used to extract project-runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExtractThreads {
    /// Use a specified number of threads.
    Count(usize),

    /// Use a number of threads equal to the logical CPU count.
    NumCpus,
}

impl ExtractThreads {
    /// Gets the actual number of threads computed at runtime.
    pub fn compute(self) -> usize {
        match self {
            Self::Count(threads) => threads,
            Self::NumCpus => get_num_cpus(),
        }
    }

    fn from_signed(count: i64) -> Option<Self> {
        match count.cmp(&0) {
            Ordering::Greater => Some(Self::Count(count as usize)),
            Ordering::Less => Some(Self::Count((get_num_cpus() as i64 + count).max(1) as usize)),
            Ordering::Equal => None,
        }
    }
}

impl FromStr for ExtractThreads {
    type Err = ThreadsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "num-cpus" {
            return Ok(Self::NumCpus);
        }

        let count: i64 = s
            .parse()
            .map_err(|err| ThreadsParseError::new(s, format!("{err}")))?;
        Self::from_signed(count).ok_or_else(|| ThreadsParseError::new(s, "threads may not be 0"))
    }
}

impl fmt::Display for ExtractThreads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(threads) => write!(f, "{threads}"),
            Self::NumCpus => write!(f, "num-cpus"),
        }
    }
}

impl<'de> Deserialize<'de> for ExtractThreads {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = ExtractThreads;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "an integer or the string \"num-cpus\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v == "num-cpus" {
                    Ok(ExtractThreads::NumCpus)
                } else {
                    Err(serde::de::Error::invalid_value(
                        serde::de::Unexpected::Str(v),
                        &self,
                    ))
                }
            }

            // TOML integers are i64.
            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                ExtractThreads::from_signed(v).ok_or_else(|| {
                    serde::de::Error::invalid_value(serde::de::Unexpected::Signed(v), &self)
                })
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match i64::try_from(v) {
                    Ok(v) => self.visit_i64(v),
                    Err(_) => Err(serde::de::Error::invalid_value(
                        serde::de::Unexpected::Unsigned(v),
                        &self,
                    )),
                }
            }
        }

        deserializer.deserialize_any(V)
    }
}

pub(crate) fn get_num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use maplit::btreeset;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn write_config(contents: &str) -> Utf8TempDir {
        let dir = Utf8TempDir::new().unwrap();
        let config_path = dir.path().join(EnvflakeConfig::CONFIG_PATH);
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(&config_path, contents).unwrap();
        dir
    }

    #[test]
    fn default_config_values() {
        let config = EnvflakeConfig::default_config();
        assert_eq!(config.store().interchange, "final_all.csv");
        assert_eq!(config.store().flaky_report, "flaky_tests_report.csv");
        assert_eq!(config.discovery(), &DiscoveryConfig::default());
        assert_eq!(config.collect().threads, ExtractThreads::NumCpus);
        assert_eq!(config.classify_options().failure_outcomes, None);
    }

    #[test]
    fn missing_repo_config_uses_defaults() {
        let dir = Utf8TempDir::new().unwrap();
        let config = EnvflakeConfig::from_sources(dir.path(), None).unwrap();
        assert_eq!(config.store().interchange, "final_all.csv");
    }

    #[test]
    fn repo_config_layers_on_defaults() {
        let dir = write_config(indoc! {r#"
            [store]
            interchange = "final.csv"

            [collect]
            threads = 3

            [classify]
            failure-outcomes = ["failed", "error"]
        "#});

        let config = EnvflakeConfig::from_sources(dir.path(), None).unwrap();
        assert_eq!(config.store().interchange, "final.csv");
        assert_eq!(
            config.store().flaky_report,
            "flaky_tests_report.csv",
            "unset keys keep their defaults"
        );
        assert_eq!(config.collect().threads, ExtractThreads::Count(3));
        assert_eq!(
            config.classify_options().failure_outcomes,
            Some(btreeset! {Outcome::Failed, Outcome::Errored}),
        );
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = Utf8TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = EnvflakeConfig::from_sources(dir.path(), Some(&missing)).unwrap_err();
        assert_eq!(err.config_file(), missing);
        assert!(
            matches!(err.kind(), ConfigParseErrorKind::BuildError(_)),
            "expected build error, found {err:?}"
        );
    }

    #[test_case(
        indoc! {r#"
            [collect]
            threads = 0
        "#},
        "collect.threads"
        ; "zero threads"
    )]
    #[test_case(
        indoc! {r#"
            [collect]
            threads = "many"
        "#},
        "collect.threads"
        ; "string threads"
    )]
    #[test_case(
        indoc! {r#"
            [discovery]
            metadata-extension = ["csv"]
        "#},
        "discovery.metadata-extension"
        ; "wrong type"
    )]
    fn invalid_config(contents: &str, expected_path: &str) {
        let dir = write_config(contents);
        let err = EnvflakeConfig::from_sources(dir.path(), None).unwrap_err();
        match err.kind() {
            ConfigParseErrorKind::DeserializeError(err) => {
                assert_eq!(err.path().to_string(), expected_path);
            }
            other => panic!("expected deserialize error, found {other:?}"),
        }
    }

    #[test_case("num-cpus", Some(ExtractThreads::NumCpus) ; "num cpus")]
    #[test_case("4", Some(ExtractThreads::Count(4)) ; "positive")]
    #[test_case("0", None ; "zero")]
    #[test_case("four", None ; "not a number")]
    fn threads_from_str(input: &str, expected: Option<ExtractThreads>) {
        assert_eq!(input.parse::<ExtractThreads>().ok(), expected);
    }

    #[test]
    fn negative_threads_are_relative() {
        let threads: ExtractThreads = "-1".parse().unwrap();
        assert_eq!(threads.compute(), (get_num_cpus() - 1).max(1));
    }
}
