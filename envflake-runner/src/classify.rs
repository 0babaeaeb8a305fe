// Copyright (c) The envflake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-environment flakiness classification.
//!
//! Classification needs the complete record set: the *environment universe*, the set of every
//! environment that appears anywhere in the input, is only known once all records have been
//! seen. A test is flaky if the set of environments it was observed failing in differs from the
//! universe.
//!
//! By default every record counts as a failure observation, since the interchange artifact is
//! normally filtered to failures upstream. This conflates "ran and passed" with "failed" for
//! unfiltered inputs; [`ClassifyOptions::failure_outcomes`] restricts which outcomes count.
//!
//! If the universe has a single environment, no test can be flaky. This is reported as a
//! [`Limitation`] rather than as an absence of flaky tests.

use crate::record::{CanonicalRecord, Environment, Outcome, TestIdentity};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Options for [`classify`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClassifyOptions {
    /// If set, only records with one of these outcomes count as failure observations.
    ///
    /// The environment universe is always computed from every record.
    pub failure_outcomes: Option<BTreeSet<Outcome>>,
}

impl ClassifyOptions {
    fn counts_as_failure(&self, record: &CanonicalRecord) -> bool {
        match &self.failure_outcomes {
            Some(outcomes) => outcomes.contains(&record.outcome),
            None => true,
        }
    }
}

/// The classification of one flaky test.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlakyVerdict {
    /// The test this verdict is for.
    pub identity: TestIdentity,

    /// The outcome of the first record seen for this test. Differing outcomes across
    /// environments are not reconciled.
    pub outcome: Outcome,

    /// The environments this test failed in.
    pub failing_environments: BTreeSet<Environment>,

    /// The environments in the universe this test did not fail in.
    pub passing_environments: BTreeSet<Environment>,
}

impl FlakyVerdict {
    /// Returns the project name.
    pub fn project(&self) -> &str {
        &self.identity.project
    }

    /// Returns the test name.
    pub fn test_name(&self) -> &str {
        &self.identity.test_name
    }
}

/// A condition under which classification cannot find flaky tests regardless of input content.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Limitation {
    /// The input had no records.
    EmptyInput,

    /// Only one environment was observed, so every test fails in every observed environment.
    SingleEnvironment(Environment),
}

/// Summary statistics over the flaky verdicts.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FlakyStats {
    /// The number of flaky tests, keyed by the number of environments they fail in.
    pub by_failing_env_count: BTreeMap<usize, usize>,

    /// The number of flaky tests per representative outcome, most common first, ties broken by
    /// outcome name.
    pub by_outcome: Vec<(Outcome, usize)>,
}

impl FlakyStats {
    fn new(verdicts: &[FlakyVerdict]) -> Self {
        let mut by_failing_env_count = BTreeMap::new();
        let mut outcome_counts = BTreeMap::new();
        for verdict in verdicts {
            *by_failing_env_count
                .entry(verdict.failing_environments.len())
                .or_insert(0) += 1;
            *outcome_counts.entry(verdict.outcome.clone()).or_insert(0) += 1;
        }

        let mut by_outcome: Vec<_> = outcome_counts.into_iter().collect();
        // The BTreeMap yields outcomes in name order, and the sort is stable.
        by_outcome.sort_by(|(_, a), (_, b)| b.cmp(a));

        Self {
            by_failing_env_count,
            by_outcome,
        }
    }
}

/// The result of a classification run.
///
/// Created once by [`classify`] and never mutated afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Classification {
    universe: BTreeSet<Environment>,
    verdicts: Vec<FlakyVerdict>,
    total_tests: usize,
    stats: FlakyStats,
    limitation: Option<Limitation>,
}

impl Classification {
    /// Returns the set of every environment seen in the input.
    pub fn universe(&self) -> &BTreeSet<Environment> {
        &self.universe
    }

    /// Returns the flaky verdicts, ordered by project and then test name.
    pub fn verdicts(&self) -> &[FlakyVerdict] {
        &self.verdicts
    }

    /// Returns the number of distinct tests that had at least one failure observation.
    pub fn total_tests(&self) -> usize {
        self.total_tests
    }

    /// Returns summary statistics over the verdicts.
    pub fn stats(&self) -> &FlakyStats {
        &self.stats
    }

    /// Returns the limitation that applied to this run, if any.
    pub fn limitation(&self) -> Option<&Limitation> {
        self.limitation.as_ref()
    }

    /// Returns the number of distinct projects among the verdicts.
    pub fn flaky_project_count(&self) -> usize {
        self.verdicts
            .iter()
            .map(FlakyVerdict::project)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

struct Group<'a> {
    representative: &'a CanonicalRecord,
    failing: BTreeSet<Environment>,
}

/// Classifies tests as flaky across environments.
///
/// This is a pure function of its input: classifying the same records twice produces equal
/// results.
pub fn classify(records: &[CanonicalRecord], options: &ClassifyOptions) -> Classification {
    let universe: BTreeSet<Environment> = records
        .iter()
        .map(|record| record.environment.clone())
        .collect();

    let limitation = if records.is_empty() {
        warn!("no records to classify");
        Some(Limitation::EmptyInput)
    } else if universe.len() == 1 {
        let env = universe.first().cloned().unwrap_or(Environment::Unknown);
        warn!(
            "only one environment (`{env}`) was observed: \
             flakiness across environments cannot be determined"
        );
        Some(Limitation::SingleEnvironment(env))
    } else {
        None
    };

    let mut groups: BTreeMap<TestIdentity, Group<'_>> = BTreeMap::new();
    for record in records {
        if !options.counts_as_failure(record) {
            continue;
        }
        groups
            .entry(record.identity())
            .or_insert_with(|| Group {
                representative: record,
                failing: BTreeSet::new(),
            })
            .failing
            .insert(record.environment.clone());
    }

    let total_tests = groups.len();
    let verdicts: Vec<_> = groups
        .into_iter()
        .filter(|(_, group)| group.failing != universe)
        .map(|(identity, group)| {
            let passing_environments = universe.difference(&group.failing).cloned().collect();
            FlakyVerdict {
                identity,
                outcome: group.representative.outcome.clone(),
                failing_environments: group.failing,
                passing_environments,
            }
        })
        .collect();

    debug!(
        "classified {total_tests} tests across {} environments: {} flaky",
        universe.len(),
        verdicts.len(),
    );

    let stats = FlakyStats::new(&verdicts);
    Classification {
        universe,
        verdicts,
        total_tests,
        stats,
        limitation,
    }
}
