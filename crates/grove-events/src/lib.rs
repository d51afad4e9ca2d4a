// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! grove-events: Test harness output decoding for grove
//!
//! This library crate turns raw test-harness output (libtest human output,
//! libtest JSON, or cargo-nextest's libtest-json mode) into typed lifecycle
//! events, and splits test identifiers into tree path segments.
//!
//! # Example
//!
//! ```
//! use grove_events::{HarnessEvent, QualifiedName, decode_line};
//!
//! let event = decode_line(r#"{"type":"test","event":"ok","name":"pkg::pkg$a::b","exec_time":0.005}"#)
//!     .unwrap()
//!     .unwrap();
//! let name = QualifiedName::parse(event.test_name().unwrap()).unwrap();
//! assert_eq!(name.tree_path("unused"), ["pkg", "a", "b"]);
//! ```

#![warn(missing_docs)]

pub mod decoder;
pub mod discovery;
pub mod error;
pub mod outcome;
pub mod path;

pub use decoder::{HarnessEvent, LibtestEvent, decode_line, decode_transcript};
pub use discovery::{DiscoveredTest, TestList, load_list_file, parse_list_output};
pub use error::EventsError;
pub use outcome::{SuiteSummary, TestOutcome};
pub use path::{QualifiedName, SEGMENT_DELIMITER, is_doctest_name, join_segments, split_segments};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::decoder::{HarnessEvent, decode_line};
    pub use crate::error::EventsError;
    pub use crate::outcome::{SuiteSummary, TestOutcome};
    pub use crate::path::QualifiedName;
}
