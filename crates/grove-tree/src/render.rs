// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Textual tree rendering
//!
//! One node per line, depth marked by repeated dots, each name followed by
//! its status marker:
//!
//! ```text
//! [root](-)
//! .sandbox(-)
//! ..test_ignored(~)
//! ..test_should_fail(-)
//! ..test_should_pass(+)
//! ```

use crate::status::Status;
use crate::tree::TestTree;

/// Rendering of a run whose root was terminated, in compact mode
pub const TERMINATED_BANNER: &str = "Test terminated";

/// Render every node of the tree
#[must_use]
pub fn render_tree(tree: &TestTree) -> String {
    let mut out = String::new();
    for (depth, id) in tree.walk() {
        if !out.is_empty() {
            out.push('\n');
        }
        let node = &tree[id];
        out.extend(std::iter::repeat_n('.', depth));
        out.push_str(node.name());
        out.push_str(node.status().marker());
    }
    out
}

/// Like [`render_tree`], but a terminated run collapses to a single line
#[must_use]
pub fn render_tree_compact(tree: &TestTree) -> String {
    if tree.root().status() == Status::Terminated {
        TERMINATED_BANNER.to_string()
    } else {
        render_tree(tree)
    }
}
