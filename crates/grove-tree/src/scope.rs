// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Run-scope filtering
//!
//! An invocation runs either everything, one target, one module, or one
//! test. The scope decides which discovered tests the tree should expect,
//! so tests the harness was never asked to run do not linger as pending.

use std::fmt;

use grove_events::{EventsError, join_segments, split_segments};
use serde::{Deserialize, Serialize};

/// The invocation context of a run
///
/// Paths include the owning target as their first segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "path", rename_all = "lowercase")]
pub enum RunScope {
    /// Every discovered test
    #[default]
    Everything,
    /// Every test of one target
    Target(String),
    /// Every test below a module path
    Module(Vec<String>),
    /// Exactly one test
    Test(Vec<String>),
}

/// How a candidate path relates to the run scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeVerdict {
    /// Inside the invocation context; expected to be reported
    Selected,
    /// A strict ancestor of the invocation context
    Ancestor,
    /// In the invoked target but not selected
    Unselected,
    /// Outside the invocation context entirely
    Outside,
}

impl ScopeVerdict {
    /// Whether a discovered test with this verdict should be materialized
    #[must_use]
    pub fn is_expected(self) -> bool {
        self == Self::Selected
    }
}

impl RunScope {
    /// Scope covering a single `::`-delimited test path (target first)
    ///
    /// # Errors
    ///
    /// Returns `EventsError::MalformedIdentifier` if the path cannot be
    /// segmented.
    pub fn test(path: &str) -> Result<Self, EventsError> {
        Ok(Self::Test(split_segments(path)?))
    }

    /// Scope covering a `::`-delimited module path (target first)
    ///
    /// A single-segment path is treated as a whole target.
    ///
    /// # Errors
    ///
    /// Returns `EventsError::MalformedIdentifier` if the path cannot be
    /// segmented.
    pub fn module(path: &str) -> Result<Self, EventsError> {
        let mut segments = split_segments(path)?;
        if segments.len() == 1 {
            return Ok(Self::Target(segments.remove(0)));
        }
        Ok(Self::Module(segments))
    }

    /// Classify a candidate tree path
    #[must_use]
    pub fn verdict<S: AsRef<str>>(&self, path: &[S]) -> ScopeVerdict {
        let scope_path: &[String] = match self {
            Self::Everything => return ScopeVerdict::Selected,
            Self::Target(target) => std::slice::from_ref(target),
            Self::Module(path) | Self::Test(path) => path,
        };

        let shared = path
            .iter()
            .zip(scope_path)
            .take_while(|(a, b)| a.as_ref() == b.as_str())
            .count();

        if shared == scope_path.len() {
            ScopeVerdict::Selected
        } else if shared == path.len() {
            ScopeVerdict::Ancestor
        } else if shared >= 1 {
            ScopeVerdict::Unselected
        } else {
            ScopeVerdict::Outside
        }
    }

    /// Whether the scope names this target
    #[must_use]
    pub fn covers_target(&self, target: &str) -> bool {
        self.verdict(&[target]) != ScopeVerdict::Outside
    }
}

impl fmt::Display for RunScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Everything => f.write_str("everything"),
            Self::Target(target) => write!(f, "target {target}"),
            Self::Module(path) => write!(f, "module {}", join_segments(path)),
            Self::Test(path) => write!(f, "test {}", join_segments(path)),
        }
    }
}
