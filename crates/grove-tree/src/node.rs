// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Tree node types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::status::Status;

/// Handle to a node inside a [`TestTree`](crate::tree::TestTree)
///
/// Handles are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The synthetic root of every tree
    pub const ROOT: NodeId = NodeId(0);

    /// Position of the node in creation order
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Synthetic root; one child per test target
    Root,
    /// A target or module grouping other nodes
    Container,
    /// A single executable test
    Leaf,
}

/// A node of the test tree
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) segments: Vec<String>,
    pub(crate) kind: NodeKind,
    pub(crate) status: Status,
    pub(crate) self_duration: Option<u64>,
    pub(crate) duration: u64,
    pub(crate) complete: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: IndexMap<String, NodeId>,
    pub(crate) location_id: String,
    pub(crate) out_of_scope: bool,
    pub(crate) unreported: bool,
    pub(crate) output: Option<String>,
}

impl Node {
    pub(crate) fn new(
        segments: Vec<String>,
        kind: NodeKind,
        parent: Option<NodeId>,
        location_id: String,
    ) -> Self {
        Self {
            segments,
            kind,
            status: Status::NotStarted,
            self_duration: None,
            duration: 0,
            complete: false,
            parent,
            children: IndexMap::new(),
            location_id,
            out_of_scope: false,
            unreported: false,
            output: None,
        }
    }

    /// Full path from the root
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The node's own segment; the root is named `[root]`
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments.last().map_or("[root]", String::as_str)
    }

    /// Node kind
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Duration in milliseconds
    ///
    /// For a leaf this is the measured duration (zero until it finishes). For
    /// a container it is the sum over children that have reached a terminal
    /// status, and is only final once [`Node::duration_is_final`] holds.
    #[must_use]
    pub fn duration(&self) -> u64 {
        match self.kind {
            NodeKind::Leaf => self.self_duration.unwrap_or(0),
            NodeKind::Root | NodeKind::Container => self.duration,
        }
    }

    /// Measured duration of a finished leaf
    #[must_use]
    pub fn self_duration(&self) -> Option<u64> {
        self.self_duration
    }

    /// Whether [`Node::duration`] is authoritative
    ///
    /// A leaf's duration is final once it has a verdict. A container's is
    /// final once every child has one; its own status can already be
    /// `Failed` while a sibling is still running.
    #[must_use]
    pub fn duration_is_final(&self) -> bool {
        match self.kind {
            NodeKind::Leaf => self.status.is_terminal(),
            NodeKind::Root | NodeKind::Container => self.complete,
        }
    }

    /// Parent handle; `None` for the root
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in insertion order
    pub fn child_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }

    /// Look up a direct child by segment
    #[must_use]
    pub fn child(&self, segment: &str) -> Option<NodeId> {
        self.children.get(segment).copied()
    }

    /// Number of direct children
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Opaque source-location identifier, fixed at creation
    #[must_use]
    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    /// Whether an event created this node outside the invocation context
    #[must_use]
    pub fn is_out_of_scope(&self) -> bool {
        self.out_of_scope
    }

    /// Whether the harness announced tests here that never reported
    ///
    /// Such a container reads `Terminated` whatever its children say.
    #[must_use]
    pub fn has_unreported(&self) -> bool {
        self.unreported
    }

    /// Captured output attached to the finish event, if any
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Whether this node is a leaf
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }
}
