// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! The test tree
//!
//! Nodes live in an arena owned by [`TestTree`]; each node owns its children
//! through an ordered segment -> [`NodeId`] map and refers to its parent by
//! id. Leaf updates walk upward from the changed leaf, recomputing each
//! ancestor's status and duration from its children, and stop at the first
//! ancestor that did not change.
//!
//! # Example
//!
//! ```
//! use grove_events::TestOutcome;
//! use grove_tree::{RunScope, Status, TestTree};
//!
//! let mut tree = TestTree::new(RunScope::Everything);
//! tree.finish(&["pkg", "a"], TestOutcome::Passed, 5, None).unwrap();
//! tree.finish(&["pkg", "b"], TestOutcome::Failed, 3, None).unwrap();
//!
//! let pkg = tree.find("pkg").unwrap();
//! assert_eq!(pkg.status(), Status::Failed);
//! assert_eq!(pkg.duration(), 8);
//! ```

use std::ops::Index;

use grove_events::{TestOutcome, join_segments, split_segments};
use tracing::{debug, trace};

use crate::error::TreeError;
use crate::location::LocationResolver;
use crate::node::{Node, NodeId, NodeKind};
use crate::scope::{RunScope, ScopeVerdict};
use crate::status::Status;

/// Effect of an event on the leaf it addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The leaf moved between statuses
    Changed {
        /// Status before the event
        from: Status,
        /// Status after the event
        to: Status,
    },
    /// The event carried nothing new (e.g. a repeated start)
    Unchanged,
    /// A finish arrived for a leaf that already had a verdict
    UnexpectedFinish {
        /// The verdict the leaf keeps
        status: Status,
    },
}

/// Result of addressing a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafUpdate {
    /// The addressed leaf
    pub node: NodeId,
    /// What happened to it
    pub transition: Transition,
    /// Whether the leaf was created by this event
    pub created: bool,
    /// Whether the leaf lies outside the invocation context
    pub filter_mismatch: bool,
}

/// An incrementally built tree of test results for one run
#[derive(Debug)]
pub struct TestTree {
    nodes: Vec<Node>,
    scope: RunScope,
    locations: LocationResolver,
    swept: bool,
    frozen: bool,
}

impl TestTree {
    /// Create an empty tree with the default location resolver
    #[must_use]
    pub fn new(scope: RunScope) -> Self {
        Self::with_locations(scope, LocationResolver::default())
    }

    /// Create an empty tree that assigns location ids with `locations`
    #[must_use]
    pub fn with_locations(scope: RunScope, locations: LocationResolver) -> Self {
        let root = Node::new(Vec::new(), NodeKind::Root, None, String::new());
        Self {
            nodes: vec![root],
            scope,
            locations,
            swept: false,
            frozen: false,
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// The synthetic root
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Node by handle
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Handle of the node at `path` (target first), if it exists
    #[must_use]
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        path.iter().try_fold(NodeId::ROOT, |current, segment| {
            self.nodes[current.0].child(segment.as_ref())
        })
    }

    /// Node at a `::`-delimited path such as `sandbox::test_mod::test`
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&Node> {
        let segments = split_segments(path).ok()?;
        self.lookup(&segments).map(|id| &self.nodes[id.0])
    }

    /// Node at a `::`-delimited path, or an error naming the missing path
    ///
    /// # Errors
    ///
    /// Returns `TreeError::UnknownNode` if nothing lives at `path`.
    pub fn require(&self, path: &str) -> Result<&Node, TreeError> {
        self.find(path).ok_or_else(|| TreeError::UnknownNode {
            path: path.to_string(),
        })
    }

    /// Children of a node in insertion order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.nodes[id.0]
            .child_ids()
            .map(move |child| &self.nodes[child.0])
    }

    /// Depth-first walk yielding `(depth, id)`, root first at depth 0
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![(0, NodeId::ROOT)],
        }
    }

    /// All leaves in creation order
    pub fn leaves(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    /// Number of nodes, root included
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds nothing but the root
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// The invocation context this tree was built for
    #[must_use]
    pub fn scope(&self) -> &RunScope {
        &self.scope
    }

    /// Whether the terminal sweep has run
    #[must_use]
    pub fn is_swept(&self) -> bool {
        self.swept
    }

    /// Whether the run is complete and the tree rejects updates
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// `::`-joined path of a node
    #[must_use]
    pub fn path_of(&self, id: NodeId) -> String {
        join_segments(&self.nodes[id.0].segments)
    }

    // ------------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------------

    /// Materialize a discovered test as a `NotStarted` leaf
    ///
    /// Only tests the run scope selects are created; for anything else this
    /// returns `Ok(None)` and leaves the tree untouched. Seeding an existing
    /// leaf is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::RunFrozen` after [`TestTree::freeze`],
    /// `TreeError::MalformedIdentifier` for paths without a test below the
    /// target, and `TreeError::KindConflict` if the path is already a module.
    pub fn seed<S: AsRef<str>>(&mut self, path: &[S]) -> Result<Option<NodeId>, TreeError> {
        self.ensure_writable()?;
        if !self.scope.verdict(path).is_expected() {
            trace!(path = %join_segments(path), "not seeding unselected test");
            return Ok(None);
        }
        let first_new = self.nodes.len();
        let (id, created) = self.ensure_leaf(path)?;
        if created {
            self.propagate(id, first_new);
        }
        Ok(Some(id))
    }

    /// Record that the harness started a test
    ///
    /// # Errors
    ///
    /// See [`TestTree::seed`].
    pub fn start<S: AsRef<str>>(&mut self, path: &[S]) -> Result<LeafUpdate, TreeError> {
        self.ensure_writable()?;
        let first_new = self.nodes.len();
        let (id, created) = self.ensure_leaf(path)?;

        let from = self.nodes[id.0].status;
        let transition = if from == Status::NotStarted {
            self.nodes[id.0].status = Status::Running;
            Transition::Changed {
                from,
                to: Status::Running,
            }
        } else {
            Transition::Unchanged
        };

        if created || transition != Transition::Unchanged {
            self.propagate(id, first_new);
        }
        Ok(self.leaf_update(id, transition, created))
    }

    /// Record a test's verdict and measured duration
    ///
    /// A leaf seen for the first time here goes straight to its verdict. A
    /// leaf that already has a verdict keeps it and the call reports
    /// [`Transition::UnexpectedFinish`].
    ///
    /// # Errors
    ///
    /// See [`TestTree::seed`].
    pub fn finish<S: AsRef<str>>(
        &mut self,
        path: &[S],
        outcome: TestOutcome,
        duration_ms: u64,
        output: Option<String>,
    ) -> Result<LeafUpdate, TreeError> {
        self.ensure_writable()?;
        let first_new = self.nodes.len();
        let (id, created) = self.ensure_leaf(path)?;

        let node = &mut self.nodes[id.0];
        let from = node.status;
        if from.is_terminal() {
            debug!(path = %join_segments(path), status = %from, "ignoring repeated finish");
            return Ok(self.leaf_update(id, Transition::UnexpectedFinish { status: from }, created));
        }

        let to = Status::from(outcome);
        node.status = to;
        node.self_duration = Some(duration_ms);
        node.output = output;
        self.propagate(id, first_new);
        Ok(self.leaf_update(id, Transition::Changed { from, to }, created))
    }

    /// Move every unfinished leaf to `Terminated` and re-derive all containers
    ///
    /// Returns the number of leaves swept. Terminated leaves are terminal, so
    /// repeating the sweep without new events sweeps nothing.
    pub fn terminate_all(&mut self) -> usize {
        self.swept = true;

        let mut swept = 0;
        for node in self.nodes.iter_mut().filter(|n| n.is_leaf()) {
            if !node.status.is_terminal() {
                node.status = Status::Terminated;
                swept += 1;
            }
        }

        // Children are always created after their parent, so a reverse scan
        // sees every child before the container that holds it.
        for index in (0..self.nodes.len()).rev() {
            if !self.nodes[index].is_leaf() {
                self.recompute(NodeId(index));
            }
        }
        swept
    }

    /// Record that the container at `path` lost tests the harness announced
    ///
    /// The container, created if missing, reads `Terminated` from now on and
    /// its ancestors are re-derived. Used when a run ends before a suite
    /// reported every test it announced and no leaf exists for the rest.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::RunFrozen` after [`TestTree::freeze`],
    /// `TreeError::MalformedIdentifier` for an empty path and
    /// `TreeError::KindConflict` if the path names a leaf.
    pub fn mark_unreported<S: AsRef<str>>(&mut self, path: &[S]) -> Result<NodeId, TreeError> {
        self.ensure_writable()?;
        let first_new = self.nodes.len();
        let id = self.ensure_container(path)?;
        self.nodes[id.0].unreported = true;
        self.recompute(id);
        self.propagate(id, first_new);
        debug!(path = %join_segments(path), "container has unreported tests");
        Ok(id)
    }

    /// Reject every further update
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn ensure_writable(&self) -> Result<(), TreeError> {
        if self.frozen {
            Err(TreeError::RunFrozen)
        } else {
            Ok(())
        }
    }

    fn leaf_update(&self, node: NodeId, transition: Transition, created: bool) -> LeafUpdate {
        LeafUpdate {
            node,
            transition,
            created,
            filter_mismatch: self.nodes[node.0].out_of_scope,
        }
    }

    /// Return the leaf at `path`, creating it and any missing ancestors
    fn ensure_leaf<S: AsRef<str>>(&mut self, path: &[S]) -> Result<(NodeId, bool), TreeError> {
        if path.len() < 2 || path.iter().any(|s| s.as_ref().is_empty()) {
            return Err(TreeError::MalformedIdentifier {
                identifier: join_segments(path),
            });
        }

        let mut current = NodeId::ROOT;
        let mut created = false;
        for (depth, segment) in path.iter().enumerate() {
            let is_last = depth + 1 == path.len();
            match self.nodes[current.0].child(segment.as_ref()) {
                Some(child) => {
                    let existing = self.nodes[child.0].kind;
                    if is_last != (existing == NodeKind::Leaf) {
                        return Err(TreeError::KindConflict {
                            path: join_segments(&path[..=depth]),
                            existing,
                        });
                    }
                    current = child;
                }
                None => {
                    let kind = if is_last {
                        NodeKind::Leaf
                    } else {
                        NodeKind::Container
                    };
                    current = self.insert(current, &path[..=depth], kind);
                    created = true;
                }
            }
        }
        Ok((current, created))
    }

    /// Return the container at `path`, creating it and any missing ancestors
    fn ensure_container<S: AsRef<str>>(&mut self, path: &[S]) -> Result<NodeId, TreeError> {
        if path.is_empty() || path.iter().any(|s| s.as_ref().is_empty()) {
            return Err(TreeError::MalformedIdentifier {
                identifier: join_segments(path),
            });
        }

        let mut current = NodeId::ROOT;
        for (depth, segment) in path.iter().enumerate() {
            current = match self.nodes[current.0].child(segment.as_ref()) {
                Some(child) if self.nodes[child.0].kind == NodeKind::Leaf => {
                    return Err(TreeError::KindConflict {
                        path: join_segments(&path[..=depth]),
                        existing: NodeKind::Leaf,
                    });
                }
                Some(child) => child,
                None => self.insert(current, &path[..=depth], NodeKind::Container),
            };
        }
        Ok(current)
    }

    fn insert<S: AsRef<str>>(&mut self, parent: NodeId, path: &[S], kind: NodeKind) -> NodeId {
        let segments: Vec<String> = path.iter().map(|s| s.as_ref().to_string()).collect();
        let location_id = self.locations.resolve(&segments);
        let out_of_scope = self.scope.verdict(&segments) == ScopeVerdict::Outside;
        let name = segments.last().cloned().unwrap_or_default();

        let id = NodeId(self.nodes.len());
        let mut node = Node::new(segments, kind, Some(parent), location_id);
        node.out_of_scope = out_of_scope;
        self.nodes.push(node);
        self.nodes[parent.0].children.insert(name, id);
        trace!(path = %self.path_of(id), ?kind, "created node");
        id
    }

    /// Re-derive ancestors of `from`, stopping at the first unchanged one
    ///
    /// Nodes with an index of at least `first_new` were created by the
    /// current event; they are always recomputed.
    fn propagate(&mut self, from: NodeId, first_new: usize) {
        let mut current = self.nodes[from.0].parent;
        while let Some(id) = current {
            let changed = self.recompute(id);
            if !changed && id.0 < first_new {
                break;
            }
            current = self.nodes[id.0].parent;
        }
    }

    /// Re-derive a container's status, duration and completeness; returns whether any changed
    fn recompute(&mut self, id: NodeId) -> bool {
        let children: Vec<&Node> = self.nodes[id.0]
            .child_ids()
            .map(|child| &self.nodes[child.0])
            .collect();
        let mut status = Status::aggregate(children.iter().map(|child| child.status));
        let duration = children
            .iter()
            .filter(|child| child.status.is_terminal())
            .fold(0u64, |sum, child| sum.saturating_add(child.duration()));
        let mut complete =
            !children.is_empty() && children.iter().all(|child| child.duration_is_final());

        let node = &mut self.nodes[id.0];
        if node.unreported {
            status = status.max(Status::Terminated);
            complete = false;
        }
        let changed =
            node.status != status || node.duration != duration || node.complete != complete;
        node.status = status;
        node.duration = duration;
        node.complete = complete;
        changed
    }
}

impl Index<NodeId> for TestTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

/// Depth-first iterator over a [`TestTree`]
pub struct Walk<'a> {
    tree: &'a TestTree,
    stack: Vec<(usize, NodeId)>,
}

impl Iterator for Walk<'_> {
    type Item = (usize, NodeId);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, id) = self.stack.pop()?;
        let children: Vec<NodeId> = self.tree.nodes[id.0].child_ids().collect();
        self.stack
            .extend(children.into_iter().rev().map(|child| (depth + 1, child)));
        Some((depth, id))
    }
}
