// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Test identifier resolution
//!
//! libtest joins a test's module path and function name with `::`, and
//! nextest additionally prefixes the name with `<package>::<binary>$`. This
//! module reverses both conventions into an ordered list of path segments.
//!
//! # Example
//!
//! ```
//! use grove_events::path::QualifiedName;
//!
//! let name = QualifiedName::parse("sandbox::sandbox$outer::inner::t1").unwrap();
//! assert_eq!(name.target(), Some("sandbox"));
//! assert_eq!(name.segments(), ["outer", "inner", "t1"]);
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EventsError;

/// Delimiter between path segments of a test identifier
pub const SEGMENT_DELIMITER: &str = "::";

/// Separator nextest puts between the binary id and the test name
const BINARY_SEPARATOR: char = '$';

/// rustdoc's `<file> - <item path> (line <n>)`, optionally `- compile fail`
static DOCTEST_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\S.*? - .+ \(line \d+\)(?: - compile(?: fail)?)?$").expect("valid regex")
});

/// Whether `identifier` names a doctest rather than a module path
#[must_use]
pub fn is_doctest_name(identifier: &str) -> bool {
    DOCTEST_NAME_RE.is_match(identifier.trim())
}

/// Split an identifier into its `::`-delimited segments
///
/// Doctest names stay whole: the `::` inside their item path is not a
/// module boundary.
///
/// # Errors
///
/// Returns `EventsError::MalformedIdentifier` if the identifier is empty,
/// consists only of delimiters, or contains an empty or `:`-edged segment
/// (which happens when the delimiter is repeated, as in `a::::b` or `a:::b`).
pub fn split_segments(identifier: &str) -> Result<Vec<String>, EventsError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(EventsError::malformed(identifier));
    }
    if is_doctest_name(trimmed) {
        return Ok(vec![trimmed.to_string()]);
    }

    trimmed
        .split(SEGMENT_DELIMITER)
        .map(|segment| {
            if segment.is_empty() || segment.starts_with(':') || segment.ends_with(':') {
                Err(EventsError::malformed(identifier))
            } else {
                Ok(segment.to_string())
            }
        })
        .collect()
}

/// Join segments back into a `::`-delimited identifier
#[must_use]
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(SEGMENT_DELIMITER)
}

/// A test identifier split into an optional owning target and its path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    target: Option<String>,
    segments: Vec<String>,
}

impl QualifiedName {
    /// Parse an identifier as printed by libtest or nextest
    ///
    /// nextest names (`<package>::<binary>$<path>`) carry their target: the
    /// binary name. nextest's `@stress-<n>` and `#<retry>` decorations are
    /// dropped. Plain libtest names have no target; the caller supplies one
    /// from context.
    ///
    /// # Errors
    ///
    /// Returns `EventsError::MalformedIdentifier` if the test path or the
    /// binary id cannot be segmented.
    pub fn parse(identifier: &str) -> Result<Self, EventsError> {
        let trimmed = identifier.trim();
        let trimmed = strip_retry_suffix(trimmed);

        match trimmed.split_once(BINARY_SEPARATOR) {
            Some((binary_id, test_path)) => {
                let binary_id = binary_id
                    .split_once("@stress-")
                    .map_or(binary_id, |(id, _)| id);
                let binary_segments = split_segments(binary_id)?;
                let target = binary_segments
                    .last()
                    .cloned()
                    .ok_or_else(|| EventsError::malformed(identifier))?;
                Ok(Self {
                    target: Some(target),
                    segments: split_segments(test_path)?,
                })
            }
            None => Ok(Self {
                target: None,
                segments: split_segments(trimmed)?,
            }),
        }
    }

    /// Build a name from already-split parts
    #[must_use]
    pub fn from_parts(target: Option<String>, segments: Vec<String>) -> Self {
        Self { target, segments }
    }

    /// The target named inside the identifier, if any
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Test path segments below the target
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The test function name (last segment)
    #[must_use]
    pub fn test_fn_name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// The module path above the test function, if it is not top-level
    #[must_use]
    pub fn module_path(&self) -> Option<String> {
        match self.segments.len() {
            0 | 1 => None,
            n => Some(join_segments(&self.segments[..n - 1])),
        }
    }

    /// Full tree path: the owning target followed by the test path
    ///
    /// `default_target` is used when the identifier does not name one.
    #[must_use]
    pub fn tree_path(&self, default_target: &str) -> Vec<String> {
        let target = self.target.as_deref().unwrap_or(default_target);
        let mut path = Vec::with_capacity(self.segments.len() + 1);
        path.push(target.to_string());
        path.extend(self.segments.iter().cloned());
        path
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(target) = &self.target {
            write!(f, "{target}{BINARY_SEPARATOR}")?;
        }
        f.write_str(&join_segments(&self.segments))
    }
}

/// Drop nextest's `#<n>` retry suffix
fn strip_retry_suffix(name: &str) -> &str {
    match name.rsplit_once('#') {
        Some((base, attempt))
            if !base.is_empty()
                && !attempt.is_empty()
                && attempt.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => name,
    }
}
