// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! grove-tree: Incremental test-tree reconstruction for grove
//!
//! This library crate builds a hierarchical tree of test results (root ->
//! target -> module -> test) from the typed events produced by
//! `grove-events`, while the harness is still running. Each node carries a
//! status, a duration and a stable location identifier.
//!
//! # Example
//!
//! ```
//! use grove_tree::{ProcessExit, RunSession, Status};
//!
//! let mut session = RunSession::default();
//! for line in [
//!     "     Running unittests src/lib.rs (target/debug/deps/sandbox-0123456789abcdef)",
//!     "running 2 tests",
//!     "test tests::a ... ok",
//!     "test tests::b ... FAILED",
//!     "test result: FAILED. 1 passed; 1 failed; 0 ignored; 0 measured; 0 filtered out; finished in 0.00s",
//! ] {
//!     session.apply_line(line);
//! }
//!
//! let report = session.finish(ProcessExit::Completed);
//! assert_eq!(report.status, Status::Failed);
//! assert_eq!(
//!     grove_tree::render_tree(&session.tree().read()),
//!     "[root](-)\n.sandbox(-)\n..tests(-)\n...a(+)\n...b(-)"
//! );
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod location;
pub mod node;
pub mod render;
pub mod report;
pub mod scope;
pub mod session;
pub mod status;
pub mod tree;

pub use grove_events::SEGMENT_DELIMITER;

pub use error::TreeError;
pub use location::{LocationResolver, WorkspaceFingerprint, WorkspaceIdentity};
pub use node::{Node, NodeId, NodeKind};
pub use render::{render_tree, render_tree_compact};
pub use report::{RunReport, StatusCounts, TreeSnapshot};
pub use scope::{RunScope, ScopeVerdict};
pub use session::{
    ApplyOutcome, LineOutcome, ProcessExit, RunConfig, RunSession, RunStats, SharedTree,
    TerminationReason,
};
pub use status::Status;
pub use tree::{LeafUpdate, TestTree, Transition};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::node::{Node, NodeId, NodeKind};
    pub use crate::scope::RunScope;
    pub use crate::session::{ProcessExit, RunConfig, RunSession};
    pub use crate::status::Status;
    pub use crate::tree::TestTree;
}
