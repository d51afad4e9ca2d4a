// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Serializable snapshots and run reports

use chrono::{DateTime, Utc};
use grove_events::SuiteSummary;
use serde::{Deserialize, Serialize};

use crate::node::{NodeId, NodeKind};
use crate::session::{RunStats, TerminationReason};
use crate::status::Status;
use crate::tree::TestTree;

/// Point-in-time copy of a subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Node name (`[root]` for the root)
    pub name: String,
    /// Node kind
    pub kind: NodeKind,
    /// Status at capture time
    pub status: Status,
    /// Duration in milliseconds at capture time
    pub duration_ms: u64,
    /// Whether the duration was final at capture time
    pub duration_final: bool,
    /// Location identifier
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location_id: String,
    /// Whether the node lies outside the invocation context
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub out_of_scope: bool,
    /// Whether the harness announced tests here that never reported
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unreported: bool,
    /// Captured output of a leaf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Children in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeSnapshot>,
}

impl TreeSnapshot {
    /// Capture the whole tree
    #[must_use]
    pub fn capture(tree: &TestTree) -> Self {
        Self::capture_node(tree, NodeId::ROOT)
    }

    /// Capture the subtree rooted at `id`
    #[must_use]
    pub fn capture_node(tree: &TestTree, id: NodeId) -> Self {
        let node = &tree[id];
        Self {
            name: node.name().to_string(),
            kind: node.kind(),
            status: node.status(),
            duration_ms: node.duration(),
            duration_final: node.duration_is_final(),
            location_id: node.location_id().to_string(),
            out_of_scope: node.is_out_of_scope(),
            unreported: node.has_unreported(),
            output: node.output().map(str::to_string),
            children: node
                .child_ids()
                .map(|child| Self::capture_node(tree, child))
                .collect(),
        }
    }

    /// Descendant at a path of names relative to this node
    #[must_use]
    pub fn descendant<S: AsRef<str>>(&self, path: &[S]) -> Option<&TreeSnapshot> {
        path.iter().try_fold(self, |node, name| {
            node.children
                .iter()
                .find(|child| child.name == name.as_ref())
        })
    }
}

/// Number of leaves in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Passed leaves
    pub passed: usize,
    /// Failed leaves
    pub failed: usize,
    /// Ignored leaves
    pub ignored: usize,
    /// Leaves swept to `Terminated`
    pub terminated: usize,
    /// Leaves still running
    pub running: usize,
    /// Leaves never reported
    pub not_started: usize,
}

impl StatusCounts {
    /// Count the leaves of a tree
    #[must_use]
    pub fn tally(tree: &TestTree) -> Self {
        let mut counts = Self::default();
        for leaf in tree.leaves() {
            let slot = match leaf.status() {
                Status::Passed => &mut counts.passed,
                Status::Failed => &mut counts.failed,
                Status::Ignored => &mut counts.ignored,
                Status::Terminated => &mut counts.terminated,
                Status::Running => &mut counts.running,
                Status::NotStarted => &mut counts.not_started,
            };
            *slot += 1;
        }
        counts
    }

    /// Total number of leaves
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.ignored + self.terminated + self.running + self.not_started
    }
}

/// Final account of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// When the session was created
    pub started_at: DateTime<Utc>,
    /// When the run was finished
    pub finished_at: DateTime<Utc>,
    /// Root status
    pub status: Status,
    /// Root duration in milliseconds
    pub duration_ms: u64,
    /// Leaves per status
    pub counts: StatusCounts,
    /// Session counters
    pub stats: RunStats,
    /// Tests the harness announced it would run
    pub expected_tests: usize,
    /// Merged harness summary, if any suite finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SuiteSummary>,
    /// Why the run was terminated, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<TerminationReason>,
    /// The final tree
    pub tree: TreeSnapshot,
}

impl RunReport {
    pub(crate) fn new(
        tree: &TestTree,
        stats: RunStats,
        expected_tests: usize,
        summary: Option<SuiteSummary>,
        termination: Option<TerminationReason>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            status: tree.root().status(),
            duration_ms: tree.root().duration(),
            counts: StatusCounts::tally(tree),
            stats,
            expected_tests,
            summary,
            termination,
            tree: TreeSnapshot::capture(tree),
        }
    }

    /// Whether every reported test passed or was ignored
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
