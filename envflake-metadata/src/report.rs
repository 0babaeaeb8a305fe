// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A nested test report for one project-run, as produced by `pytest-json-report`.
///
/// Only the parts envflake reads are modeled; other top-level keys (`summary`, `environment`,
/// `duration` and so on) are ignored during deserialization.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct TestReport {
    /// Per-test results. `None` if the key is absent from the report.
    #[serde(default)]
    pub tests: Option<Vec<ReportTest>>,

    /// Collection-phase results. `None` if the key is absent from the report.
    #[serde(default)]
    pub collectors: Option<Vec<ReportCollector>>,
}

impl TestReport {
    /// Parses a report from a JSON string.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// The result of a single test.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ReportTest {
    /// The node identifier of the test, for example `tests/test_io.py::test_read`.
    #[serde(default)]
    pub nodeid: Option<String>,

    /// The line the test is defined on.
    ///
    /// A value that is not a line number (negative, too large or not an integer) is treated as
    /// missing.
    #[serde(default, deserialize_with = "deserialize_lineno")]
    pub lineno: Option<u32>,

    /// The setup stage, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<StageData>,

    /// The call stage, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<StageData>,

    /// The teardown stage, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teardown: Option<StageData>,
}

impl ReportTest {
    /// Returns the data recorded for the given stage, if any.
    ///
    /// An empty stage object is returned as-is; use [`StageData::is_present`] to check it.
    pub fn stage(&self, stage: Stage) -> Option<&StageData> {
        match stage {
            Stage::Setup => self.setup.as_ref(),
            Stage::Call => self.call.as_ref(),
            Stage::Teardown => self.teardown.as_ref(),
        }
    }
}

/// An execution stage of a test.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Stage {
    /// Fixture setup.
    Setup,
    /// The test body.
    Call,
    /// Fixture teardown.
    Teardown,
}

impl Stage {
    /// All stages, in execution order.
    pub const ALL: [Stage; 3] = [Stage::Setup, Stage::Call, Stage::Teardown];

    /// Returns the key used for this stage in the report.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Call => "call",
            Stage::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The data recorded for one stage of a test.
///
/// This is kept as a raw JSON object: reporters are free to add keys, and a stage counts as
/// recorded as soon as it has any key at all.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct StageData(Map<String, Value>);

impl StageData {
    /// Returns true if this stage carries any data.
    pub fn is_present(&self) -> bool {
        !self.0.is_empty()
    }

    /// Returns the raw outcome string for this stage, if set.
    pub fn outcome(&self) -> Option<&str> {
        self.0.get("outcome").and_then(Value::as_str)
    }

    /// Returns the line number from the nested `crash` object, if set.
    pub fn crash_lineno(&self) -> Option<u32> {
        lineno_from_value(self.0.get("crash")?.get("lineno")?)
    }
}

fn lineno_from_value(value: &Value) -> Option<u32> {
    u32::try_from(value.as_u64()?).ok()
}

fn deserialize_lineno<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(lineno_from_value))
}

/// The result of a collection (test discovery) phase.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ReportCollector {
    /// The node identifier of the collected item, for example a module path.
    #[serde(default)]
    pub nodeid: Option<String>,

    /// The raw outcome string, for example `passed` or `failed`.
    #[serde(default)]
    pub outcome: Option<String>,
}

impl ReportCollector {
    /// Returns true if collection failed for this node.
    pub fn is_failed(&self) -> bool {
        self.outcome.as_deref() == Some("failed")
    }
}
