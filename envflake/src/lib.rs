// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Find tests that fail in some operating-system environments but not others.
//!
//! `envflake collect` turns a directory of per-environment test runs into a single interchange
//! file, and `envflake classify` reads that file and reports the tests whose failures are
//! environment-dependent. `envflake run` does both.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
#[cfg(test)]
mod tests_integration;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter};
