// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report the results of collect and classify runs in human and machine-readable formats.
//!
//! The machine-readable output is the flaky report CSV, written by [`write_flaky_report`]. The
//! human-readable output is produced by [`SummaryReporter`] and [`CollectReporter`].

mod collect;
mod flaky_csv;
mod helpers;
mod summary;

pub use collect::CollectReporter;
pub use flaky_csv::*;
pub use summary::SummaryReporter;
