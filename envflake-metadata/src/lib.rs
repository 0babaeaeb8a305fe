// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to the raw inputs and documented outputs of envflake.
//!
//! envflake consumes one nested test report per project-run, in the shape produced by
//! `pytest-json-report`. This crate contains the serde model for that report, so that
//! other tools can produce or inspect reports without depending on the envflake
//! runner. It also documents the exit codes of the `envflake` binary.

mod exit_codes;
mod report;

pub use exit_codes::*;
pub use report::*;
