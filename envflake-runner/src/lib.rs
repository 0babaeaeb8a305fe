// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for envflake.
//!
//! envflake aggregates test reports produced by independent runs of the same projects, one run
//! per operating-system environment, and flags tests whose failure behavior differs across
//! environments.
//!
//! The basic flow of operations is:
//!
//! 1. [`discovery`] finds the metadata and report artifacts for each project-run.
//! 2. [`extract`] turns one project-run into a sequence of [`record::CanonicalRecord`]s.
//! 3. [`collect`] runs extraction across all project-runs and concatenates the results, which
//!    [`interchange`] persists as a flat CSV artifact.
//! 4. [`classify`] reads the full record set and computes a [`classify::FlakyVerdict`] per test,
//!    which [`reporter`] writes out.

pub mod classify;
pub mod collect;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod extract;
pub(crate) mod helpers;
pub mod interchange;
pub mod record;
pub mod reporter;
