// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The canonical record model shared by extraction and classification.

use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

/// The outcome of a single test observation.
///
/// Outcomes that envflake doesn't know about, such as `xfailed`, are carried through as
/// [`Outcome::Other`] with the raw string.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Outcome {
    /// The test passed.
    Passed,
    /// The test failed.
    Failed,
    /// The test errored, typically in a fixture.
    Errored,
    /// The test was skipped.
    Skipped,
    /// The module or item containing the test could not be collected.
    CollectionError,
    /// Any other raw outcome string, including the empty string if the outcome was not recorded.
    Other(String),
}

impl Outcome {
    /// Parses a raw outcome string.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "error" => Self::Errored,
            "skipped" => Self::Skipped,
            "collection_error" => Self::CollectionError,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the raw string for this outcome.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Errored => "error",
            Self::Skipped => "skipped",
            Self::CollectionError => "collection_error",
            Self::Other(other) => other,
        }
    }
}

/// The environment a test observation was produced in.
///
/// Environments are compared by name: sorting a set of environments sorts it alphabetically,
/// which is the order used in all output.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Environment {
    /// macOS.
    Mac,
    /// Linux, including Ubuntu.
    Linux,
    /// Windows.
    Windows,
    /// An environment that could not be detected.
    Unknown,
    /// A raw environment name carried through from the metadata.
    Other(String),
}

impl Environment {
    /// Parses a raw environment name.
    ///
    /// Only the exact canonical names map to the known variants. Other names are carried through
    /// unchanged, so that two distinct raw names remain two distinct environments.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "mac" => Self::Mac,
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            "unknown" => Self::Unknown,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Detects an environment from keywords in a file name or path.
    ///
    /// Matching is case-insensitive and checked in order: `mac`, then `linux` or `ubuntu`, then
    /// `windows` or `win`.
    pub fn detect(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("mac") {
            Self::Mac
        } else if name.contains("linux") || name.contains("ubuntu") {
            Self::Linux
        } else if name.contains("windows") || name.contains("win") {
            Self::Windows
        } else {
            Self::Unknown
        }
    }

    /// Returns the name of this environment.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mac => "mac",
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Unknown => "unknown",
            Self::Other(other) => other,
        }
    }
}

// Outcome and Environment compare by their string form, so that `Other("linux")` built by hand
// is the same value as `Linux`.
macro_rules! impl_by_str {
    ($ty:ty) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.as_str() == other.as_str()
            }
        }

        impl Eq for $ty {}

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> Ordering {
                self.as_str().cmp(other.as_str())
            }
        }

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.as_str().hash(state);
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<String> for $ty {
            fn from(raw: String) -> Self {
                Self::from_raw(&raw)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_owned()
            }
        }
    };
}

impl_by_str!(Outcome);
impl_by_str!(Environment);

/// One normalized test observation.
///
/// Field names match the columns of the interchange artifact.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CanonicalRecord {
    /// The canonical project name.
    pub project: String,

    /// The test identifier within the project, typically a node id.
    pub test_name: String,

    /// The outcome of the observation.
    pub outcome: Outcome,

    /// The line number associated with a failure, if known.
    pub lineno: Option<u32>,

    /// The environment the observation was produced in.
    pub environment: Environment,
}

impl CanonicalRecord {
    /// Returns the identity of the test this record belongs to.
    pub fn identity(&self) -> TestIdentity {
        TestIdentity::new(&self.project, &self.test_name)
    }
}

/// Identifies a test across environments: a project plus a test identifier.
///
/// The two components are stored separately, so no separator is needed and none can collide
/// with either component.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TestIdentity {
    /// The project name.
    pub project: String,

    /// The test identifier within the project.
    pub test_name: String,
}

impl TestIdentity {
    /// Creates a new identity.
    pub fn new(project: impl Into<String>, test_name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            test_name: test_name.into(),
        }
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.project, self.test_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use test_case::test_case;

    #[test_case("passed", Outcome::Passed ; "passed")]
    #[test_case("failed", Outcome::Failed ; "failed")]
    #[test_case("error", Outcome::Errored ; "error")]
    #[test_case("skipped", Outcome::Skipped ; "skipped")]
    #[test_case("collection_error", Outcome::CollectionError ; "collection error")]
    #[test_case("xfailed", Outcome::Other("xfailed".to_owned()) ; "xfailed")]
    #[test_case("", Outcome::Other(String::new()) ; "empty")]
    fn outcome_from_raw(raw: &str, expected: Outcome) {
        let outcome = Outcome::from_raw(raw);
        assert_eq!(outcome, expected);
        assert_eq!(outcome.as_str(), raw, "display round-trips the raw string");
    }

    #[test_case("macos-latest-run", Environment::Mac ; "mac")]
    #[test_case("results/Ubuntu-22.04/meta.csv", Environment::Linux ; "ubuntu")]
    #[test_case("LINUX.csv", Environment::Linux ; "linux uppercase")]
    #[test_case("windows-2022", Environment::Windows ; "windows")]
    #[test_case("win64/meta.csv", Environment::Windows ; "win")]
    #[test_case("freebsd/meta.csv", Environment::Unknown ; "unknown")]
    // "darwin" contains "win", and keywords are matched as substrings.
    #[test_case("darwin", Environment::Windows ; "substring match")]
    // mac is checked first.
    #[test_case("mac-vs-windows", Environment::Mac ; "mac wins")]
    fn environment_detect(name: &str, expected: Environment) {
        assert_eq!(Environment::detect(name), expected);
    }

    #[test]
    fn environment_raw_names() {
        assert_eq!(Environment::from_raw("linux"), Environment::Linux);
        assert_eq!(
            Environment::from_raw("ubuntu-latest"),
            Environment::Other("ubuntu-latest".to_owned()),
            "non-canonical names are carried through"
        );
        assert_eq!(
            Environment::Other("mac".to_owned()),
            Environment::Mac,
            "equality is by name"
        );
    }

    #[test]
    fn environments_sort_by_name() {
        let envs: BTreeSet<_> = [
            Environment::Windows,
            Environment::Mac,
            Environment::Other("bsd".to_owned()),
            Environment::Linux,
        ]
        .into_iter()
        .collect();
        let names: Vec<_> = envs.iter().map(Environment::as_str).collect();
        assert_eq!(names, ["bsd", "linux", "mac", "windows"]);
    }

    #[test]
    fn identity_display_and_order() {
        let a = TestIdentity::new("p1", "tests/a.py::x");
        let b = TestIdentity::new("p1", "tests/b.py::x");
        let c = TestIdentity::new("p2", "tests/a.py::x");
        assert!(a < b && b < c);
        assert_eq!(a.to_string(), "p1::tests/a.py::x");

        // Components containing the display separator stay distinct.
        assert_ne!(
            TestIdentity::new("p::q", "t"),
            TestIdentity::new("p", "q::t"),
        );
    }
}
