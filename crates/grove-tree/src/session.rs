// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Run sessions
//!
//! A [`RunSession`] owns everything about one harness run: the tree, the
//! current target context and the run counters. Lines are applied strictly
//! in order; each event is fully propagated under the tree's write lock
//! before the next one is read, so readers holding a [`SharedTree`] always
//! see a consistent tree.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use grove_events::{
    EventsError, HarnessEvent, QualifiedName, SuiteSummary, TestList, decode_line, join_segments,
};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::TreeError;
use crate::location::{LocationResolver, WorkspaceFingerprint};
use crate::node::NodeId;
use crate::report::RunReport;
use crate::scope::RunScope;
use crate::status::Status;
use crate::tree::{LeafUpdate, TestTree, Transition};

/// Target name used when the output never announces one
pub const DEFAULT_TARGET: &str = "tests";

// ============================================================================
// Shared tree
// ============================================================================

/// A test tree shared between the session and concurrent readers
///
/// Readers take read guards; only the owning session writes.
#[derive(Debug, Clone)]
pub struct SharedTree(Arc<RwLock<TestTree>>);

impl SharedTree {
    fn new(tree: TestTree) -> Self {
        Self(Arc::new(RwLock::new(tree)))
    }

    /// Lock the tree for reading
    pub fn read(&self) -> RwLockReadGuard<'_, TestTree> {
        self.0.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, TestTree> {
        self.0.write()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Which tests the invocation asked for
    pub scope: RunScope,
    /// Target for plain test names seen before any target banner
    pub default_target: String,
    /// Identity hashed into location ids
    pub workspace: WorkspaceFingerprint,
    /// Protocol prefix for location ids (empty for none)
    pub location_prefix: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scope: RunScope::Everything,
            default_target: DEFAULT_TARGET.to_string(),
            workspace: WorkspaceFingerprint::default(),
            location_prefix: String::new(),
        }
    }
}

impl RunConfig {
    /// Set the invocation scope
    #[must_use]
    pub fn with_scope(mut self, scope: RunScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the fallback target name
    #[must_use]
    pub fn with_default_target(mut self, target: impl Into<String>) -> Self {
        self.default_target = target.into();
        self
    }

    /// Set the workspace identity
    #[must_use]
    pub fn with_workspace(mut self, workspace: WorkspaceFingerprint) -> Self {
        self.workspace = workspace;
        self
    }

    /// Set the location id prefix
    #[must_use]
    pub fn with_location_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.location_prefix = prefix.into();
        self
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Why the unfinished part of a run was swept to `Terminated`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminationReason {
    /// The harness reported that the test process died
    Crashed {
        /// Cause as reported by the harness
        reason: String,
    },
    /// No output arrived within the stall timeout
    Stalled {
        /// The timeout that elapsed, in milliseconds
        timeout_ms: u64,
    },
    /// The run was cancelled by the caller
    Cancelled,
    /// The output ended before every expected test reported
    Incomplete,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crashed { reason } => write!(f, "test process crashed ({reason})"),
            Self::Stalled { timeout_ms } => write!(f, "no output for {timeout_ms}ms"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Incomplete => f.write_str("output ended before all tests reported"),
        }
    }
}

/// How the harness output ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// The stream reached its end
    Completed,
    /// The caller killed the harness
    Killed,
    /// The stream stopped producing lines
    Stalled {
        /// How long the transport waited
        after: Duration,
    },
}

/// Result of applying one event
#[derive(Debug)]
pub enum ApplyOutcome {
    /// Context bookkeeping only; the tree did not change
    Context,
    /// A leaf was created or changed status
    Updated {
        /// The addressed leaf
        node: NodeId,
        /// What happened to it
        transition: Transition,
    },
    /// A finish arrived for a leaf that already had a verdict
    UnexpectedFinish {
        /// The addressed leaf
        node: NodeId,
        /// The verdict it keeps
        status: Status,
    },
    /// The event addressed a test outside the invocation context
    FilterMismatch {
        /// The recorded (and flagged) leaf
        node: NodeId,
        /// `::`-joined tree path
        path: String,
    },
    /// The run was terminated and unfinished leaves were swept
    Terminated {
        /// Number of leaves moved to `Terminated`
        swept: usize,
    },
    /// The event could not be applied and was dropped
    Rejected(TreeError),
}

impl ApplyOutcome {
    /// Whether the event was dropped
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Result of applying one raw line
#[derive(Debug)]
pub enum LineOutcome {
    /// The line carried no event
    Skipped,
    /// The line decoded to an event, which was applied
    Applied(ApplyOutcome),
    /// The line looked like an event but could not be decoded
    Undecodable(EventsError),
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Raw lines received
    pub lines: usize,
    /// Events decoded
    pub events: usize,
    /// Lines or events that were dropped
    pub dropped: usize,
    /// Events that addressed a test outside the invocation context
    pub filter_mismatches: usize,
    /// Finish events for tests that already had a verdict
    pub unexpected_finishes: usize,
    /// Tests seeded from a discovery index
    pub seeded: usize,
}

// ============================================================================
// Session
// ============================================================================

/// One harness run
#[derive(Debug)]
pub struct RunSession {
    tree: SharedTree,
    default_target: String,
    current_target: Option<String>,
    stats: RunStats,
    open_suites: usize,
    expected_tests: usize,
    suite_expected: usize,
    suite_reported: usize,
    summary: Option<SuiteSummary>,
    termination: Option<TerminationReason>,
    started_at: DateTime<Utc>,
}

impl Default for RunSession {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}

impl RunSession {
    /// Start a run with the given settings
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        let locations =
            LocationResolver::new(config.workspace).with_prefix(config.location_prefix);
        Self {
            tree: SharedTree::new(TestTree::with_locations(config.scope, locations)),
            default_target: config.default_target,
            current_target: None,
            stats: RunStats::default(),
            open_suites: 0,
            expected_tests: 0,
            suite_expected: 0,
            suite_reported: 0,
            summary: None,
            termination: None,
            started_at: Utc::now(),
        }
    }

    /// Handle for concurrent readers
    #[must_use]
    pub fn tree(&self) -> SharedTree {
        self.tree.clone()
    }

    /// Counters so far
    #[must_use]
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// The target plain test names currently resolve to
    #[must_use]
    pub fn current_target(&self) -> &str {
        self.current_target
            .as_deref()
            .unwrap_or(&self.default_target)
    }

    /// Merged summary of every finished suite
    #[must_use]
    pub fn summary(&self) -> Option<&SuiteSummary> {
        self.summary.as_ref()
    }

    /// Why the run was terminated, if it was
    #[must_use]
    pub fn termination(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    /// Seed the tree with every selected test of a discovery index
    ///
    /// Returns the number of leaves created or confirmed.
    pub fn seed_from(&mut self, list: &TestList) -> usize {
        let mut tree = self.tree.write();
        let mut seeded = 0;
        for test in list.discovered_tests() {
            let path = test.name.tree_path(&test.target);
            match tree.seed(&path) {
                Ok(Some(_)) => seeded += 1,
                Ok(None) => {}
                Err(error) => {
                    warn!(test = %test.name, %error, "could not seed discovered test");
                }
            }
        }
        self.stats.seeded += seeded;
        info!(seeded, scope = %tree.scope(), "seeded tree from discovery index");
        seeded
    }

    /// Decode and apply one raw line of harness output
    pub fn apply_line(&mut self, line: &str) -> LineOutcome {
        self.stats.lines += 1;
        match decode_line(line) {
            Ok(Some(event)) => LineOutcome::Applied(self.apply_event(event)),
            Ok(None) => LineOutcome::Skipped,
            Err(error) => {
                self.stats.dropped += 1;
                debug!(%error, "dropping undecodable line");
                LineOutcome::Undecodable(error)
            }
        }
    }

    /// Apply one decoded event
    ///
    /// Never fails: problems are reported through the outcome, logged and
    /// counted.
    pub fn apply_event(&mut self, event: HarnessEvent) -> ApplyOutcome {
        self.stats.events += 1;
        if self.tree.read().is_frozen() {
            return self.record(ApplyOutcome::Rejected(TreeError::RunFrozen));
        }

        let outcome = match event {
            HarnessEvent::TargetStarted { target } => {
                info!(%target, "target started");
                self.current_target = Some(target);
                ApplyOutcome::Context
            }
            HarnessEvent::SuiteStarted { expected_count } => {
                debug!(expected_count, target = %self.current_target(), "suite started");
                self.open_suites += 1;
                self.expected_tests = self.expected_tests.saturating_add(expected_count);
                self.suite_expected = expected_count;
                self.suite_reported = 0;
                ApplyOutcome::Context
            }
            HarnessEvent::TestStarted { name } => {
                self.apply_to_leaf(&name, |tree, path| tree.start(path))
            }
            HarnessEvent::TestFinished {
                name,
                outcome,
                duration_ms,
                output,
            } => {
                let outcome = self.apply_to_leaf(&name, move |tree, path| {
                    tree.finish(path, outcome, duration_ms, output)
                });
                if !outcome.is_rejected() {
                    self.suite_reported = self.suite_reported.saturating_add(1);
                }
                outcome
            }
            HarnessEvent::SuiteFinished { summary } => {
                debug!(passed = summary.passed, failed = summary.failed, "suite finished");
                self.open_suites = self.open_suites.saturating_sub(1);
                self.suite_expected = 0;
                self.suite_reported = 0;
                match &mut self.summary {
                    Some(merged) => merged.merge(&summary),
                    None => self.summary = Some(summary),
                }
                ApplyOutcome::Context
            }
            HarnessEvent::ProcessTerminated { reason } => {
                let swept = self.terminate(TerminationReason::Crashed { reason });
                ApplyOutcome::Terminated { swept }
            }
        };
        self.record(outcome)
    }

    /// Sweep every unfinished leaf to `Terminated`
    ///
    /// If the open suite reported fewer tests than it announced, the current
    /// target is marked as having unreported tests, so it reads `Terminated`
    /// even when no leaf was left to sweep. The first reason given is the one
    /// reported. Returns the number of leaves swept.
    pub fn terminate(&mut self, reason: TerminationReason) -> usize {
        let mut tree = self.tree.write();
        let missing = self.suite_expected.saturating_sub(self.suite_reported);
        if self.open_suites > 0 && missing > 0 {
            let target = self.current_target().to_string();
            match tree.mark_unreported(&[target.as_str()]) {
                Ok(_) => debug!(%target, missing, "suite ended before all tests reported"),
                Err(error) => warn!(%target, %error, "could not mark unreported tests"),
            }
        }
        let swept = tree.terminate_all();
        drop(tree);
        info!(swept, %reason, "run terminated");
        if self.termination.is_none() {
            self.termination = Some(reason);
        }
        swept
    }

    /// End the run, sweeping anything unfinished, and freeze the tree
    pub fn finish(&mut self, exit: ProcessExit) -> RunReport {
        match exit {
            ProcessExit::Completed => {
                let unfinished = self
                    .tree
                    .read()
                    .leaves()
                    .any(|leaf| !leaf.status().is_terminal());
                if unfinished || self.open_suites > 0 {
                    self.terminate(TerminationReason::Incomplete);
                }
            }
            ProcessExit::Killed => {
                self.terminate(TerminationReason::Cancelled);
            }
            ProcessExit::Stalled { after } => {
                let timeout_ms = u64::try_from(after.as_millis()).unwrap_or(u64::MAX);
                self.terminate(TerminationReason::Stalled { timeout_ms });
            }
        }

        let mut tree = self.tree.write();
        tree.freeze();
        info!(
            status = %tree.root().status(),
            duration_ms = tree.root().duration(),
            events = self.stats.events,
            dropped = self.stats.dropped,
            "run complete"
        );
        RunReport::new(
            &tree,
            self.stats,
            self.expected_tests,
            self.summary,
            self.termination.clone(),
            self.started_at,
        )
    }

    fn apply_to_leaf<F>(&mut self, name: &str, update: F) -> ApplyOutcome
    where
        F: FnOnce(&mut TestTree, &[String]) -> Result<LeafUpdate, TreeError>,
    {
        let path = match QualifiedName::parse(name) {
            Ok(qualified) => qualified.tree_path(self.current_target()),
            Err(error) => return ApplyOutcome::Rejected(TreeError::from_events(error)),
        };

        let mut tree = self.tree.write();
        match update(&mut *tree, path.as_slice()) {
            Ok(LeafUpdate {
                node,
                transition: Transition::UnexpectedFinish { status },
                ..
            }) => ApplyOutcome::UnexpectedFinish { node, status },
            Ok(LeafUpdate {
                node,
                filter_mismatch: true,
                ..
            }) => ApplyOutcome::FilterMismatch {
                node,
                path: join_segments(&path),
            },
            Ok(LeafUpdate {
                node, transition, ..
            }) => ApplyOutcome::Updated { node, transition },
            Err(error) => ApplyOutcome::Rejected(error),
        }
    }

    fn record(&mut self, outcome: ApplyOutcome) -> ApplyOutcome {
        match &outcome {
            ApplyOutcome::Rejected(error) => {
                self.stats.dropped += 1;
                match error {
                    TreeError::KindConflict { .. } => warn!(%error, "dropping event"),
                    _ => debug!(%error, "dropping event"),
                }
            }
            ApplyOutcome::FilterMismatch { path, .. } => {
                self.stats.filter_mismatches += 1;
                warn!(%path, "event outside the invocation context");
            }
            ApplyOutcome::UnexpectedFinish { status, .. } => {
                self.stats.unexpected_finishes += 1;
                debug!(%status, "finish for a test that already has a verdict");
            }
            ApplyOutcome::Context | ApplyOutcome::Updated { .. } | ApplyOutcome::Terminated { .. } => {}
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_events::TestOutcome;
    use similar_asserts::assert_eq;

    fn status_at(session: &RunSession, path: &str) -> Option<Status> {
        session.tree().read().find(path).map(|node| node.status())
    }

    fn status_of(session: &RunSession, path: &str) -> Status {
        status_at(session, path).unwrap_or_else(|| panic!("no node at {path}"))
    }

    #[test]
    fn test_plain_names_use_current_target() {
        let mut session = RunSession::default();
        session.apply_line("test early ... ok");
        session.apply_line("     Running unittests src/lib.rs (target/debug/deps/sandbox-0123456789abcdef)");
        session.apply_line("test late ... ok");

        assert_eq!(status_at(&session, "tests::early"), Some(Status::Passed));
        assert_eq!(status_at(&session, "sandbox::late"), Some(Status::Passed));
        assert_eq!(session.current_target(), "sandbox");
    }

    #[test]
    fn test_nextest_names_carry_their_target() {
        let mut session = RunSession::default();
        session.apply_line(
            r#"{"type":"test","event":"ok","name":"sandbox::sandbox$test_mod::test","exec_time":0.004}"#,
        );
        let tree = session.tree();
        let tree = tree.read();
        let leaf = tree.find("sandbox::test_mod::test").expect("leaf");
        assert_eq!(leaf.status(), Status::Passed);
        assert_eq!(leaf.duration(), 4);
    }

    #[test]
    fn test_skipped_and_undecodable_lines() {
        let mut session = RunSession::default();
        assert!(matches!(session.apply_line("   Compiling sandbox v0.1.0"), LineOutcome::Skipped));
        assert!(matches!(session.apply_line("{not json"), LineOutcome::Undecodable(_)));
        let stats = session.stats();
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.events, 0);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn test_unexpected_finish_is_counted() {
        let mut session = RunSession::default();
        session.apply_line("test a ... FAILED");
        let outcome = session.apply_line("test a ... ok");
        assert!(matches!(
            outcome,
            LineOutcome::Applied(ApplyOutcome::UnexpectedFinish {
                status: Status::Failed,
                ..
            })
        ));
        assert_eq!(session.stats().unexpected_finishes, 1);
    }

    #[test]
    fn test_filter_mismatch_is_surfaced() {
        let config = RunConfig::default()
            .with_default_target("pkg")
            .with_scope(RunScope::test("pkg::b").expect("scope"));
        let mut session = RunSession::new(config);
        let outcome = session.apply_event(HarnessEvent::TestFinished {
            name: "other::other$x".to_string(),
            outcome: TestOutcome::Passed,
            duration_ms: 1,
            output: None,
        });
        assert!(matches!(outcome, ApplyOutcome::FilterMismatch { ref path, .. } if path == "other::x"));
        assert_eq!(session.stats().filter_mismatches, 1);
    }

    #[test]
    fn test_crash_sweeps_unfinished_tests() {
        let mut session = RunSession::new(RunConfig::default().with_default_target("pkg"));
        session.apply_line(r#"{"type":"test","event":"started","name":"a"}"#);
        session.apply_line(r#"{"type":"test","event":"ok","name":"a","exec_time":0.001}"#);
        session.apply_line(r#"{"type":"test","event":"started","name":"b"}"#);
        let outcome = session.apply_line(
            "error: process didn't exit successfully: `/tmp/pkg-1234` (signal: 11, SIGSEGV: invalid memory reference)",
        );
        assert!(matches!(
            outcome,
            LineOutcome::Applied(ApplyOutcome::Terminated { swept: 1 })
        ));
        assert_eq!(status_at(&session, "pkg::a"), Some(Status::Passed));
        assert_eq!(status_at(&session, "pkg::b"), Some(Status::Terminated));
        assert!(matches!(
            session.termination(),
            Some(TerminationReason::Crashed { .. })
        ));
    }

    #[test]
    fn test_crash_marks_tests_that_never_reported() {
        let mut session = RunSession::default();
        session.apply_line("     Running unittests src/lib.rs (target/debug/deps/pkg-0123456789abcdef)");
        session.apply_line("running 3 tests");
        session.apply_line("test a ... ok");
        session.apply_line("test b ... ok");
        let outcome = session.apply_line(
            "  process didn't exit successfully: `/tmp/pkg-0123456789abcdef` (signal: 11, SIGSEGV: invalid memory reference)",
        );
        assert!(matches!(
            outcome,
            LineOutcome::Applied(ApplyOutcome::Terminated { swept: 0 })
        ));
        assert_eq!(status_of(&session, "pkg::a"), Status::Passed);
        assert_eq!(status_of(&session, "pkg"), Status::Terminated);
        assert!(session.tree().read().find("pkg").is_some_and(|n| n.has_unreported()));
    }

    #[test]
    fn test_crash_after_complete_suite_keeps_verdicts() {
        let mut session = RunSession::default();
        session.apply_line("     Running unittests src/lib.rs (target/debug/deps/pkg-0123456789abcdef)");
        session.apply_line("running 1 test");
        session.apply_line("test a ... ok");
        session.apply_line("test result: ok. 1 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.00s");
        session.apply_line(
            "  process didn't exit successfully: `/tmp/pkg-0123456789abcdef` (signal: 11, SIGSEGV: invalid memory reference)",
        );
        assert_eq!(status_of(&session, "pkg"), Status::Passed);
    }

    #[test]
    fn test_expected_count_saturates() {
        let mut session = RunSession::default();
        session.apply_event(HarnessEvent::SuiteStarted {
            expected_count: usize::MAX,
        });
        session.apply_event(HarnessEvent::SuiteStarted {
            expected_count: usize::MAX,
        });
        let report = session.finish(ProcessExit::Completed);
        assert_eq!(report.expected_tests, usize::MAX);
    }

    #[test]
    fn test_finish_freezes_the_tree() {
        let mut session = RunSession::default();
        session.apply_line("test a ... ok");
        let report = session.finish(ProcessExit::Completed);
        assert_eq!(report.status, Status::Passed);
        assert_eq!(report.termination, None);

        let outcome = session.apply_line("test b ... ok");
        assert!(matches!(
            outcome,
            LineOutcome::Applied(ApplyOutcome::Rejected(TreeError::RunFrozen))
        ));
        assert!(session.tree().read().find("tests::b").is_none());
    }

    #[test]
    fn test_finish_with_open_suite_is_incomplete() {
        let mut session = RunSession::default();
        session.apply_line("running 2 tests");
        session.apply_line("test a ... ok");
        let report = session.finish(ProcessExit::Completed);
        assert_eq!(report.termination, Some(TerminationReason::Incomplete));
    }

    #[test]
    fn test_stall_reports_timeout() {
        let mut session = RunSession::default();
        session.apply_line(r#"{"type":"test","event":"started","name":"slow"}"#);
        let report = session.finish(ProcessExit::Stalled {
            after: Duration::from_secs(2),
        });
        assert_eq!(
            report.termination,
            Some(TerminationReason::Stalled { timeout_ms: 2000 })
        );
        assert_eq!(report.status, Status::Terminated);
    }

    #[test]
    fn test_suite_summaries_merge() {
        let mut session = RunSession::default();
        session.apply_line("test result: ok. 2 passed; 0 failed; 1 ignored; 0 measured; 0 filtered out; finished in 0.01s");
        session.apply_line("test result: FAILED. 1 passed; 1 failed; 0 ignored; 0 measured; 3 filtered out; finished in 0.02s");
        let summary = session.summary().copied().expect("summary");
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.filtered_out, 3);
        assert!(!summary.ok);
    }
}
