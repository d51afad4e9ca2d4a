// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for grove-tree

use thiserror::Error;

use crate::node::NodeKind;

/// Errors that can occur while applying events to a test tree
///
/// None of these abort a run: the session absorbs them, logs them and moves
/// on to the next line.
#[derive(Debug, Error)]
pub enum TreeError {
    /// An event referenced a test path that cannot be segmented
    #[error("Malformed test identifier: {identifier:?}")]
    MalformedIdentifier {
        /// The identifier as reported by the harness
        identifier: String,
    },

    /// An event addressed a node as a test while the tree holds a module
    /// there (or the reverse)
    #[error("Cannot address {path} as a test: it is already a {existing:?} node")]
    KindConflict {
        /// `::`-joined path of the conflicting node
        path: String,
        /// Kind of the node already in the tree
        existing: NodeKind,
    },

    /// The run has completed and the tree no longer accepts events
    #[error("Run is complete; the tree is frozen")]
    RunFrozen,

    /// A lookup named a path that is not in the tree
    #[error("No node at {path}")]
    UnknownNode {
        /// `::`-joined path that was looked up
        path: String,
    },

    /// Error from the harness output decoder
    #[error("Decode error: {0}")]
    Events(#[from] grove_events::EventsError),
}

impl TreeError {
    /// Convert a decoder error, keeping malformed identifiers distinguishable
    #[must_use]
    pub fn from_events(error: grove_events::EventsError) -> Self {
        match error {
            grove_events::EventsError::MalformedIdentifier { identifier } => {
                Self::MalformedIdentifier { identifier }
            }
            other => Self::Events(other),
        }
    }
}
