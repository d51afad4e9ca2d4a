// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Test discovery index
//!
//! Parses `cargo nextest list --message-format json` so a run can be seeded
//! with the tests it is expected to report before the harness prints anything.
//!
//! # Example
//!
//! ```
//! use grove_events::discovery::parse_list_output;
//!
//! let list_json = r#"{"test-count": 0, "rust-suites": {}}"#;
//! let list = parse_list_output(list_json).unwrap();
//! assert!(list.discovered_tests().is_empty());
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EventsError;
use crate::path::{QualifiedName, split_segments};

// ============================================================================
// Test List Types (from `cargo nextest list --message-format json`)
// ============================================================================

/// Output from `cargo nextest list --message-format json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestList {
    /// Total number of tests
    #[serde(rename = "test-count")]
    pub test_count: usize,
    /// Test suites by binary ID
    #[serde(rename = "rust-suites")]
    pub rust_suites: BTreeMap<String, TestSuite>,
}

/// A test suite (binary containing tests)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    /// Package name
    #[serde(rename = "package-name")]
    pub package_name: String,
    /// Binary ID
    #[serde(rename = "binary-id")]
    pub binary_id: String,
    /// Binary name
    #[serde(rename = "binary-name")]
    pub binary_name: String,
    /// Kind of binary (lib, bin, test, etc.)
    #[serde(default)]
    pub kind: String,
    /// Test cases in this suite
    #[serde(default)]
    pub testcases: BTreeMap<String, TestCase>,
}

/// A single test case in a suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Kind of test (usually "test")
    #[serde(default)]
    pub kind: String,
    /// Whether the test is ignored
    #[serde(default)]
    pub ignored: bool,
    /// Whether the test matched the filters of the listing invocation
    #[serde(rename = "filter-match", default)]
    pub filter_match: Option<FilterMatch>,
}

/// nextest's record of whether a test matched the list filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum FilterMatch {
    /// The test matched
    Matches,
    /// The test was filtered out
    Mismatch {
        /// Why nextest filtered it out (e.g. "ignored", "string")
        #[serde(default)]
        reason: Option<String>,
    },
}

impl TestSuite {
    /// Number of test cases in the suite
    #[must_use]
    pub fn len(&self) -> usize {
        self.testcases.len()
    }

    /// Whether the suite lists no test cases
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.testcases.is_empty()
    }
}

impl TestCase {
    /// Whether the listing invocation selected this test
    ///
    /// Tests without filter information count as selected.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        !matches!(self.filter_match, Some(FilterMatch::Mismatch { .. }))
    }
}

/// A discovered test, resolved to its target and path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTest {
    /// Name of the binary that owns the test
    pub target: String,
    /// The test's qualified name, with the target filled in
    pub name: QualifiedName,
    /// Whether the test is marked `#[ignore]`
    pub ignored: bool,
}

impl TestList {
    /// Number of test cases listed, across every suite
    #[must_use]
    pub fn listed_count(&self) -> usize {
        self.rust_suites.values().map(TestSuite::len).sum()
    }

    /// Number of test cases in the suite with this binary id
    #[must_use]
    pub fn suite_count(&self, binary_id: &str) -> usize {
        self.rust_suites.get(binary_id).map_or(0, TestSuite::len)
    }

    /// Number of test cases marked `#[ignore]`
    #[must_use]
    pub fn ignored_count(&self) -> usize {
        self.rust_suites
            .values()
            .map(|suite| suite.testcases.values().filter(|case| case.ignored).count())
            .sum()
    }

    /// Resolve every selected test case to a target and segment path
    ///
    /// Test cases whose names cannot be segmented are skipped, as are cases
    /// the listing filtered out. Order is deterministic: by binary id, then
    /// test name.
    #[must_use]
    pub fn discovered_tests(&self) -> Vec<DiscoveredTest> {
        let mut tests = Vec::new();
        for suite in self.rust_suites.values() {
            for (test_name, case) in &suite.testcases {
                if !case.is_selected() {
                    continue;
                }
                let Ok(segments) = split_segments(test_name) else {
                    tracing::debug!(test = %test_name, "skipping unsegmentable discovered test");
                    continue;
                };
                tests.push(DiscoveredTest {
                    target: suite.binary_name.clone(),
                    name: QualifiedName::from_parts(Some(suite.binary_name.clone()), segments),
                    ignored: case.ignored,
                });
            }
        }
        tests
    }
}

// ============================================================================
// Parsing Functions
// ============================================================================

/// Parse `cargo nextest list --message-format json` output
///
/// # Errors
///
/// Returns `EventsError::JsonParse` if the JSON is invalid.
pub fn parse_list_output(json: &str) -> Result<TestList, EventsError> {
    serde_json::from_str(json).map_err(EventsError::from)
}

/// Read and parse a discovery index from a file
///
/// # Errors
///
/// Returns `EventsError::Io` if the file cannot be read, or
/// `EventsError::JsonParse` if it is not a nextest test list.
pub fn load_list_file(path: impl AsRef<Path>) -> Result<TestList, EventsError> {
    let content = std::fs::read_to_string(path)?;
    parse_list_output(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const LIST_JSON: &str = r#"{
        "test-count": 4,
        "rust-suites": {
            "suite-b": {
                "package-name": "b",
                "binary-id": "suite-b",
                "binary-name": "b",
                "kind": "lib",
                "testcases": {
                    "test_3": {"kind": "test", "ignored": true}
                }
            },
            "suite-a": {
                "package-name": "a",
                "binary-id": "suite-a",
                "binary-name": "a",
                "kind": "lib",
                "testcases": {
                    "m::test_1": {"kind": "test", "ignored": false, "filter-match": {"status": "matches"}},
                    "test_2": {"kind": "test", "ignored": false},
                    "skipped": {"kind": "test", "ignored": false, "filter-match": {"status": "mismatch", "reason": "string"}}
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_list_output() {
        let list = parse_list_output(LIST_JSON).expect("Should parse");
        assert_eq!(list.test_count, 4);
        assert_eq!(list.rust_suites.len(), 2);
        assert_eq!(list.ignored_count(), 1);
        assert_eq!(list.listed_count(), 4);
        assert_eq!(list.suite_count("suite-a"), 3);
        assert_eq!(list.suite_count("missing"), 0);
    }

    #[test]
    fn test_discovered_tests_skip_filtered() {
        let list = parse_list_output(LIST_JSON).expect("Should parse");
        let tests = list.discovered_tests();
        let paths: Vec<Vec<String>> = tests.iter().map(|t| t.name.tree_path("")).collect();
        assert_eq!(
            paths,
            vec![
                vec!["a".to_string(), "m".to_string(), "test_1".to_string()],
                vec!["a".to_string(), "test_2".to_string()],
                vec!["b".to_string(), "test_3".to_string()],
            ]
        );
        assert!(tests[2].ignored);
    }

    #[test]
    fn test_parse_invalid_list() {
        assert!(matches!(
            parse_list_output("not json"),
            Err(EventsError::JsonParse(_))
        ));
    }
}
