// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Harness output decoding
//!
//! Turns single lines of test-harness output into typed lifecycle events.
//! Two line grammars are understood and may be freely interleaved:
//! - libtest JSON (`cargo test -- -Z unstable-options --format json`, or
//!   `cargo nextest run --message-format libtest-json`)
//! - libtest's human-readable output plus the banner lines cargo prints
//!   around each test binary
//!
//! Decoding is stateless: every call looks at exactly one line. Lines that
//! match no known pattern (panic messages, backtraces, captured stdout)
//! decode to `Ok(None)`.
//!
//! # Example
//!
//! ```
//! use grove_events::decoder::{HarnessEvent, decode_line};
//! use grove_events::TestOutcome;
//!
//! let event = decode_line("test tests::it_works ... ok").unwrap();
//! assert!(matches!(
//!     event,
//!     Some(HarnessEvent::TestFinished { outcome: TestOutcome::Passed, .. })
//! ));
//! assert!(decode_line("thread 'main' panicked at src/lib.rs:3:5").unwrap().is_none());
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EventsError;
use crate::outcome::{SuiteSummary, TestOutcome, secs_to_millis};

// ============================================================================
// Events
// ============================================================================

/// A typed lifecycle event decoded from one line of harness output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HarnessEvent {
    /// Cargo started a new test binary; subsequent plain test names belong to it
    TargetStarted {
        /// Display name of the test binary (crate or target name)
        target: String,
    },
    /// A suite announced how many tests it is about to run
    SuiteStarted {
        /// Number of tests the harness expects to report
        expected_count: usize,
    },
    /// A test started running
    TestStarted {
        /// Fully-qualified test identifier as printed by the harness
        name: String,
    },
    /// A test reported its verdict
    TestFinished {
        /// Fully-qualified test identifier as printed by the harness
        name: String,
        /// Reported verdict
        outcome: TestOutcome,
        /// Measured duration in milliseconds (zero when not reported)
        duration_ms: u64,
        /// Captured output, when the harness attached it
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    /// A suite finished and printed its summary
    SuiteFinished {
        /// Counts reported by the harness
        summary: SuiteSummary,
    },
    /// The harness process died before reporting every expected test
    ProcessTerminated {
        /// Human-readable termination cause (e.g. the signal description)
        reason: String,
    },
}

impl HarnessEvent {
    /// Short name of the event kind, for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TargetStarted { .. } => "target_started",
            Self::SuiteStarted { .. } => "suite_started",
            Self::TestStarted { .. } => "test_started",
            Self::TestFinished { .. } => "test_finished",
            Self::SuiteFinished { .. } => "suite_finished",
            Self::ProcessTerminated { .. } => "process_terminated",
        }
    }

    /// The test identifier this event addresses, if any
    #[must_use]
    pub fn test_name(&self) -> Option<&str> {
        match self {
            Self::TestStarted { name } | Self::TestFinished { name, .. } => Some(name),
            _ => None,
        }
    }
}

// ============================================================================
// libtest JSON wire types
// ============================================================================

/// A single event from libtest JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LibtestEvent {
    /// Suite event (started, ok, failed)
    Suite(SuiteEvent),
    /// Test event (started, ok, failed, ignored, timeout)
    Test(TestEvent),
    /// Benchmarks and anything newer than this decoder
    #[serde(other)]
    Other,
}

/// Suite-level event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteEvent {
    /// Event type: "started" or "ok"/"failed"
    pub event: String,
    /// Number of tests (only in "started" event)
    pub test_count: Option<usize>,
    /// Number of passed tests (in final event)
    pub passed: Option<usize>,
    /// Number of failed tests (in final event)
    pub failed: Option<usize>,
    /// Number of ignored tests (in final event)
    pub ignored: Option<usize>,
    /// Number of measured benchmarks (in final event)
    pub measured: Option<usize>,
    /// Number of tests excluded by the filter (in final event)
    pub filtered_out: Option<usize>,
    /// Execution time in seconds (in final event)
    pub exec_time: Option<f64>,
}

/// Test-level event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestEvent {
    /// Event type: "started", "ok", "failed", "ignored", "timeout"
    pub event: String,
    /// Full test name, possibly prefixed with the nextest binary id
    pub name: String,
    /// Execution time in seconds (only in finished events)
    pub exec_time: Option<f64>,
    /// Captured stdout (only in failed events)
    pub stdout: Option<String>,
}

impl LibtestEvent {
    /// Lower a wire event into a [`HarnessEvent`]
    fn into_harness_event(self) -> Option<HarnessEvent> {
        match self {
            LibtestEvent::Suite(suite) if suite.event == "started" => {
                Some(HarnessEvent::SuiteStarted {
                    expected_count: suite.test_count.unwrap_or(0),
                })
            }
            LibtestEvent::Suite(suite) => Some(HarnessEvent::SuiteFinished {
                summary: SuiteSummary {
                    ok: suite.event == "ok",
                    passed: suite.passed.unwrap_or(0),
                    failed: suite.failed.unwrap_or(0),
                    ignored: suite.ignored.unwrap_or(0),
                    measured: suite.measured.unwrap_or(0),
                    filtered_out: suite.filtered_out.unwrap_or(0),
                    exec_time_ms: suite.exec_time.map(secs_to_millis),
                },
            }),
            LibtestEvent::Test(test) if test.event == "started" => {
                Some(HarnessEvent::TestStarted { name: test.name })
            }
            LibtestEvent::Test(test) => {
                let outcome = TestOutcome::from_libtest_keyword(&test.event)?;
                Some(HarnessEvent::TestFinished {
                    name: test.name,
                    outcome,
                    duration_ms: test.exec_time.map(secs_to_millis).unwrap_or(0),
                    output: test.stdout,
                })
            }
            LibtestEvent::Other => None,
        }
    }
}

// ============================================================================
// Human-readable line grammar
// ============================================================================

static RUNNING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^running (\d+) tests?$").expect("valid regex"));
static TEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^test (.+?) \.\.\. (ok|FAILED|ignored)(?:, .*?)?(?: <(\d+(?:\.\d+)?)s>)?$")
        .expect("valid regex")
});
static RESULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^test result: (ok|FAILED)\. (\d+) passed; (\d+) failed; (\d+) ignored; ",
        r"(\d+) measured; (\d+) filtered out(?:; finished in (\d+(?:\.\d+)?)s)?$"
    ))
    .expect("valid regex")
});
static TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+Running (?:(?:unittests|tests|benches) )?(?:\S+ \((.+)\)|(\S+))$").expect("valid regex")
});
static DOCTESTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+Doc-tests (\S+)$").expect("valid regex"));
static SIGNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"process didn't exit successfully: .*\((signal: [^)]+)\)\s*$").expect("valid regex")
});

/// Suffix appended to a crate name for its doc-test target
pub const DOCTEST_TARGET_SUFFIX: &str = "-doctests";

/// Strip directory, `.exe` and cargo's `-<hash>` suffix from a test binary path
fn binary_display_name(path: &str) -> &str {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let file = file.strip_suffix(".exe").unwrap_or(file);
    match file.rsplit_once('-') {
        Some((stem, hash))
            if !stem.is_empty()
                && !hash.is_empty()
                && hash.bytes().all(|b| b.is_ascii_hexdigit()) =>
        {
            stem
        }
        _ => file,
    }
}

fn capture_usize(caps: &regex::Captures<'_>, index: usize) -> Result<usize, EventsError> {
    let text = caps.get(index).map_or("0", |m| m.as_str());
    text.parse().map_err(|_| EventsError::InvalidFormat {
        message: format!("count out of range: {text}"),
    })
}

fn decode_human(line: &str) -> Result<Option<HarnessEvent>, EventsError> {
    if let Some(caps) = TEST_RE.captures(line) {
        let outcome = TestOutcome::from_libtest_keyword(&caps[2]).unwrap_or(TestOutcome::Failed);
        let duration_ms = caps
            .get(3)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map(secs_to_millis)
            .unwrap_or(0);
        return Ok(Some(HarnessEvent::TestFinished {
            name: caps[1].to_string(),
            outcome,
            duration_ms,
            output: None,
        }));
    }

    if let Some(caps) = RUNNING_RE.captures(line) {
        return Ok(Some(HarnessEvent::SuiteStarted {
            expected_count: capture_usize(&caps, 1)?,
        }));
    }

    if let Some(caps) = RESULT_RE.captures(line) {
        let exec_time_ms = caps
            .get(7)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map(secs_to_millis);
        return Ok(Some(HarnessEvent::SuiteFinished {
            summary: SuiteSummary {
                ok: &caps[1] == "ok",
                passed: capture_usize(&caps, 2)?,
                failed: capture_usize(&caps, 3)?,
                ignored: capture_usize(&caps, 4)?,
                measured: capture_usize(&caps, 5)?,
                filtered_out: capture_usize(&caps, 6)?,
                exec_time_ms,
            },
        }));
    }

    if let Some(caps) = TARGET_RE.captures(line) {
        let path = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        let target = binary_display_name(path);
        if target.is_empty() {
            return Err(EventsError::InvalidFormat {
                message: format!("test binary without a name: {line}"),
            });
        }
        return Ok(Some(HarnessEvent::TargetStarted {
            target: target.to_string(),
        }));
    }

    if let Some(caps) = DOCTESTS_RE.captures(line) {
        return Ok(Some(HarnessEvent::TargetStarted {
            target: format!("{}{DOCTEST_TARGET_SUFFIX}", &caps[1]),
        }));
    }

    if let Some(caps) = SIGNAL_RE.captures(line) {
        return Ok(Some(HarnessEvent::ProcessTerminated {
            reason: caps[1].to_string(),
        }));
    }

    Ok(None)
}

// ============================================================================
// Decoding Functions
// ============================================================================

/// Decode a single line of harness output
///
/// Lines starting with `{` are decoded as libtest JSON; everything else is
/// matched against the human-readable grammar.
///
/// # Errors
///
/// Returns `EventsError::JsonParse` if a JSON-looking line is not a libtest
/// event, or `EventsError::InvalidFormat` if a recognized line carries an
/// unusable value. Callers are expected to drop such lines and continue.
pub fn decode_line(line: &str) -> Result<Option<HarnessEvent>, EventsError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.starts_with('{') {
        let event: LibtestEvent = serde_json::from_str(trimmed)?;
        return Ok(event.into_harness_event());
    }

    decode_human(line)
}

/// Decode every line of a complete harness transcript
///
/// Undecodable lines are skipped, matching how a live run absorbs noise.
#[must_use]
pub fn decode_transcript(output: &str) -> Vec<HarnessEvent> {
    output
        .lines()
        .filter_map(|line| match decode_line(line) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "skipping undecodable line");
                None
            }
        })
        .collect()
}
