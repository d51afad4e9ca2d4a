// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Property tests for tree invariants
//!
//! Random event sequences over a small universe of test paths are applied to
//! a tree; after every step the tree must stay structurally sound and every
//! container must agree with its children.

use grove_events::TestOutcome;
use grove_tree::{NodeKind, RunScope, Status, TestTree, TreeSnapshot};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

const TARGETS: [&str; 2] = ["alpha", "beta"];
const MODULES: [&[&str]; 3] = [&[], &["m"], &["m", "n"]];
const TESTS: [&str; 3] = ["a", "b", "c"];

fn leaf_path(index: usize) -> Vec<String> {
    let target = TARGETS[index % TARGETS.len()];
    let module = MODULES[(index / TARGETS.len()) % MODULES.len()];
    let test = TESTS[(index / (TARGETS.len() * MODULES.len())) % TESTS.len()];
    std::iter::once(target)
        .chain(module.iter().copied())
        .chain(std::iter::once(test))
        .map(str::to_string)
        .collect()
}

const UNIVERSE: usize = TARGETS.len() * MODULES.len() * TESTS.len();

#[derive(Debug, Clone)]
enum Op {
    Seed(usize),
    Start(usize),
    Finish(usize, TestOutcome, u64),
}

fn outcome_strategy() -> impl Strategy<Value = TestOutcome> {
    prop_oneof![
        Just(TestOutcome::Passed),
        Just(TestOutcome::Failed),
        Just(TestOutcome::Ignored),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..UNIVERSE).prop_map(Op::Seed),
        (0..UNIVERSE).prop_map(Op::Start),
        (0..UNIVERSE, outcome_strategy(), 0u64..5_000)
            .prop_map(|(i, outcome, ms)| Op::Finish(i, outcome, ms)),
    ]
}

fn apply(tree: &mut TestTree, op: &Op) {
    let result = match op {
        Op::Seed(i) => tree.seed(&leaf_path(*i)).map(|_| ()),
        Op::Start(i) => tree.start(&leaf_path(*i)).map(|_| ()),
        Op::Finish(i, outcome, ms) => tree.finish(&leaf_path(*i), *outcome, *ms, None).map(|_| ()),
    };
    result.expect("paths in the universe never conflict");
}

fn leaf_statuses(tree: &TestTree) -> HashMap<Vec<String>, Status> {
    tree.leaves()
        .map(|leaf| (leaf.segments().to_vec(), leaf.status()))
        .collect()
}

/// Check structure and container derivation for the whole tree
fn check_consistency(tree: &TestTree) -> Result<(), TestCaseError> {
    let mut seen = HashSet::new();
    for (depth, id) in tree.walk() {
        let node = &tree[id];
        prop_assert!(seen.insert(node.segments().to_vec()), "duplicate path");
        prop_assert_eq!(node.segments().len(), depth);
        prop_assert_eq!(tree.lookup(node.segments()), Some(id));

        if let Some(parent) = node.parent() {
            let parent = &tree[parent];
            prop_assert_eq!(&node.segments()[..depth - 1], parent.segments());
        }

        match node.kind() {
            NodeKind::Leaf => prop_assert_eq!(node.child_count(), 0),
            NodeKind::Root | NodeKind::Container => {
                let children: Vec<_> = tree.children(id).collect();
                let expected = Status::aggregate(children.iter().map(|c| c.status()));
                prop_assert_eq!(node.status(), expected);

                let sum = children
                    .iter()
                    .filter(|c| c.status().is_terminal())
                    .fold(0u64, |acc, c| acc.saturating_add(c.duration()));
                prop_assert_eq!(node.duration(), sum);
            }
        }
    }
    prop_assert_eq!(seen.len(), tree.len());
    Ok(())
}

proptest! {
    #[test]
    fn prop_tree_stays_consistent(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let mut tree = TestTree::new(RunScope::Everything);
        for op in &ops {
            apply(&mut tree, op);
            check_consistency(&tree)?;
        }
        tree.terminate_all();
        check_consistency(&tree)?;
    }

    #[test]
    fn prop_terminal_leaves_never_change(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let mut tree = TestTree::new(RunScope::Everything);
        let mut settled: HashMap<Vec<String>, Status> = HashMap::new();
        for op in &ops {
            apply(&mut tree, op);
            let current = leaf_statuses(&tree);
            for (path, status) in &settled {
                prop_assert_eq!(current.get(path), Some(status));
            }
            for (path, status) in current {
                if status.is_terminal() {
                    settled.entry(path).or_insert(status);
                }
            }
        }
    }

    #[test]
    fn prop_swept_root_duration_is_sum_of_leaves(
        ops in proptest::collection::vec(op_strategy(), 1..40)
    ) {
        let mut tree = TestTree::new(RunScope::Everything);
        for op in &ops {
            apply(&mut tree, op);
        }
        tree.terminate_all();

        let leaves: u64 = tree.leaves().map(|leaf| leaf.duration()).sum();
        prop_assert_eq!(tree.root().duration(), leaves);
        prop_assert!(tree.leaves().all(|leaf| leaf.status().is_terminal()));
        prop_assert!(tree.root().duration_is_final());
    }

    #[test]
    fn prop_replaying_an_event_is_idempotent(
        ops in proptest::collection::vec(op_strategy(), 1..30)
    ) {
        let mut tree = TestTree::new(RunScope::Everything);
        for op in &ops {
            apply(&mut tree, op);
            let before = TreeSnapshot::capture(&tree);
            apply(&mut tree, op);
            prop_assert_eq!(TreeSnapshot::capture(&tree), before);
        }
    }

    #[test]
    fn prop_seeding_respects_scope(
        indices in proptest::collection::vec(0..UNIVERSE, 0..20)
    ) {
        let scope = RunScope::module("alpha::m").expect("scope");
        let mut tree = TestTree::new(scope.clone());
        for index in indices {
            let _ = tree.seed(&leaf_path(index)).expect("seed");
        }
        for leaf in tree.leaves() {
            prop_assert!(scope.verdict(leaf.segments()).is_expected());
        }
    }
}
