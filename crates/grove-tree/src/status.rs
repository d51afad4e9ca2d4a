// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Node status and composite status precedence

use std::fmt;

use grove_events::TestOutcome;
use serde::{Deserialize, Serialize};

/// Status of a tree node
///
/// Variants are declared in ascending precedence, so the derived `Ord` is the
/// aggregation order: when children disagree, the greatest status wins.
/// `Terminated > Failed > Running > NotStarted > Ignored > Passed`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Test passed
    Passed,
    /// Test was ignored
    Ignored,
    /// Known but not yet reported by the harness
    #[default]
    NotStarted,
    /// The harness reported the test as started
    Running,
    /// Test failed
    Failed,
    /// No verdict was obtained before the harness went away
    Terminated,
}

impl Status {
    /// Whether no further transition is permitted for a leaf in this status
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Passed | Self::Failed | Self::Ignored | Self::Terminated
        )
    }

    /// Composite status of a container whose children have `statuses`
    ///
    /// An empty container is `NotStarted`.
    #[must_use]
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Status>,
    {
        statuses.into_iter().max().unwrap_or(Self::NotStarted)
    }

    /// Marker used by the textual tree rendering
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Passed => "(+)",
            Self::Ignored => "(~)",
            Self::Terminated => "[T]",
            Self::NotStarted | Self::Running | Self::Failed => "(-)",
        }
    }

    /// Whether the status counts as a successful verdict
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Passed | Self::Ignored)
    }
}

impl From<TestOutcome> for Status {
    fn from(outcome: TestOutcome) -> Self {
        match outcome {
            TestOutcome::Passed => Self::Passed,
            TestOutcome::Failed => Self::Failed,
            TestOutcome::Ignored => Self::Ignored,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Passed => "passed",
            Self::Ignored => "ignored",
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}
