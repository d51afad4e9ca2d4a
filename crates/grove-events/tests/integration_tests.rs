// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Integration tests for grove-events
//!
//! These tests decode recorded harness transcripts and check the resulting
//! event streams.

use grove_events::{
    HarnessEvent, QualifiedName, TestOutcome, decode_line, decode_transcript, load_list_file,
    split_segments,
};
use proptest::prelude::*;
use similar_asserts::assert_eq;
use std::path::Path;

/// Get the fixtures directory for test data
fn fixtures_dir() -> std::path::PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    Path::new(&manifest_dir).join("tests/fixtures")
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixtures_dir().join(name))
        .unwrap_or_else(|e| panic!("Failed to read {name} fixture: {e}"))
}

#[test]
fn test_decode_human_transcript() {
    let events = decode_transcript(&read_fixture("cargo-test-human.txt"));

    let kinds: Vec<&str> = events.iter().map(HarnessEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "target_started",
            "suite_started",
            "test_finished",
            "test_finished",
            "test_finished",
            "test_finished",
            "test_finished",
            "suite_finished",
        ]
    );

    let failed: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            HarnessEvent::TestFinished {
                name,
                outcome: TestOutcome::Failed,
                ..
            } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        failed,
        vec!["suite_should_fail::nested_suite_should_fail::test_should_fail"]
    );
}

#[test]
fn test_decode_nextest_transcript() {
    let events = decode_transcript(&read_fixture("nextest-libtest.jsonl"));
    assert_eq!(events.len(), 8);
    assert_eq!(events[0], HarnessEvent::SuiteStarted { expected_count: 3 });

    let durations: Vec<(String, u64)> = events
        .iter()
        .filter_map(|e| match e {
            HarnessEvent::TestFinished {
                name, duration_ms, ..
            } => Some((name.clone(), *duration_ms)),
            _ => None,
        })
        .collect();
    assert_eq!(
        durations,
        vec![
            ("sandbox::sandbox$test_mod::test".to_string(), 1),
            ("sandbox::sandbox$test2".to_string(), 0),
            ("sandbox::sandbox$test1".to_string(), 2001),
        ]
    );

    match events.last() {
        Some(HarnessEvent::SuiteFinished { summary }) => {
            assert!(summary.ok);
            assert_eq!(summary.total(), 3);
        }
        other => panic!("expected suite summary, got {other:?}"),
    }
}

#[test]
fn test_decode_crash_transcript() {
    let events = decode_transcript(&read_fixture("cargo-test-crash.txt"));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, HarnessEvent::SuiteFinished { .. })),
        "a crashed suite never prints a summary"
    );
    assert_eq!(
        events.last(),
        Some(&HarnessEvent::ProcessTerminated {
            reason: "signal: 11, SIGSEGV: invalid memory reference".to_string()
        })
    );
}

#[test]
fn test_load_discovery_fixture() {
    let list = load_list_file(fixtures_dir().join("nextest-list.json")).expect("load list");
    assert_eq!(list.test_count, 4);
    assert_eq!(list.ignored_count(), 1);

    let names: Vec<String> = list
        .discovered_tests()
        .iter()
        .map(|t| t.name.to_string())
        .collect();
    assert_eq!(
        names,
        vec!["sandbox$test1", "sandbox$test2", "sandbox$test_mod::test"]
    );
}

#[test]
fn test_load_missing_discovery_file() {
    let result = load_list_file(fixtures_dir().join("does-not-exist.json"));
    assert!(matches!(result, Err(grove_events::EventsError::Io(_))));
}

#[test]
fn test_nextest_and_libtest_names_resolve_to_same_path() {
    let nextest = QualifiedName::parse("sandbox::sandbox$test_mod::test").expect("parse");
    let libtest = QualifiedName::parse("test_mod::test").expect("parse");
    assert_eq!(nextest.tree_path("other"), libtest.tree_path("sandbox"));
}

// ============================================================================
// Property tests
// ============================================================================

fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,12}"
}

proptest! {
    /// Property: decoding never panics, whatever the line contains
    #[test]
    fn prop_decode_line_never_panics(line in ".*") {
        let _ = decode_line(&line);
    }

    /// Property: joining valid segments and splitting again is lossless
    #[test]
    fn prop_split_inverts_join(segments in proptest::collection::vec(segment_strategy(), 1..6)) {
        let identifier = segments.join("::");
        let split = split_segments(&identifier).expect("valid identifier");
        prop_assert_eq!(split, segments);
    }

    /// Property: a human test line always decodes to the name it was printed with
    #[test]
    fn prop_human_test_line_round_trips_name(
        segments in proptest::collection::vec(segment_strategy(), 1..5),
        verdict in prop_oneof![Just("ok"), Just("FAILED"), Just("ignored")],
    ) {
        let name = segments.join("::");
        let event = decode_line(&format!("test {name} ... {verdict}")).expect("decode");
        prop_assert_eq!(event.as_ref().and_then(HarnessEvent::test_name), Some(name.as_str()));
    }
}
