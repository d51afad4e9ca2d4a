// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Test outcome and suite summary types

use serde::{Deserialize, Serialize};

/// Verdict reported by the harness for a single finished test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    /// Test passed
    Passed,
    /// Test failed (assertion, panic, or harness-level failure)
    Failed,
    /// Test was ignored/skipped
    Ignored,
}

impl TestOutcome {
    /// Map a libtest event keyword (`ok`, `failed`, `ignored`) to an outcome
    ///
    /// Returns `None` for keywords that do not finish a test, such as
    /// `started` or the `timeout` warning.
    #[must_use]
    pub fn from_libtest_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "ok" => Some(Self::Passed),
            "failed" | "FAILED" => Some(Self::Failed),
            "ignored" => Some(Self::Ignored),
            _ => None,
        }
    }

    /// Whether the outcome is a failure
    #[must_use]
    pub fn is_failure(self) -> bool {
        self == Self::Failed
    }
}

/// Counts reported by the harness when a suite finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteSummary {
    /// Whether the harness considered the suite successful
    pub ok: bool,
    /// Number of passed tests
    pub passed: usize,
    /// Number of failed tests
    pub failed: usize,
    /// Number of ignored tests
    pub ignored: usize,
    /// Number of benchmarks measured
    pub measured: usize,
    /// Number of tests excluded by the harness filter
    pub filtered_out: usize,
    /// Wall-clock time of the suite in milliseconds, when reported
    pub exec_time_ms: Option<u64>,
}

impl SuiteSummary {
    /// Total number of tests the suite reported a verdict for
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.ignored
    }

    /// Merge the counts of another suite into this one
    pub fn merge(&mut self, other: &SuiteSummary) {
        self.ok &= other.ok;
        self.passed += other.passed;
        self.failed += other.failed;
        self.ignored += other.ignored;
        self.measured += other.measured;
        self.filtered_out += other.filtered_out;
        self.exec_time_ms = match (self.exec_time_ms, other.exec_time_ms) {
            (Some(a), Some(b)) => Some(a.saturating_add(b)),
            (a, b) => a.or(b),
        };
    }
}

/// Convert libtest's fractional seconds to whole milliseconds
///
/// Negative and non-finite inputs clamp to zero.
#[must_use]
pub fn secs_to_millis(secs: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * 1000.0).round() as u64
}

/// Format a millisecond duration for display
///
/// Durations under a second render as `5ms`; longer ones as `2.50s`.
#[must_use]
pub fn duration_display(duration_ms: u64) -> String {
    if duration_ms < 1000 {
        format!("{duration_ms}ms")
    } else {
        format!("{:.2}s", duration_ms as f64 / 1000.0)
    }
}
