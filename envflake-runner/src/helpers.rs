// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Utilities for pluralizing various words based on count or plurality.
pub(crate) mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub(crate) fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "project" if `count` is 1, otherwise "projects".
    pub(crate) fn projects_str(count: usize) -> &'static str {
        if count == 1 { "project" } else { "projects" }
    }

    /// Returns "record" if `count` is 1, otherwise "records".
    pub(crate) fn records_str(count: usize) -> &'static str {
        if count == 1 { "record" } else { "records" }
    }

    /// Returns "environment" if `count` is 1, otherwise "environments".
    pub(crate) fn environments_str(count: usize) -> &'static str {
        if count == 1 {
            "environment"
        } else {
            "environments"
        }
    }
}
