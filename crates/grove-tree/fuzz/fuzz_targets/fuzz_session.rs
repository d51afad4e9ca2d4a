// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for run sessions
//!
//! Arbitrary output is replayed line by line. Applying lines must never
//! panic, and once the run is finished no leaf may be left unfinished.

#![no_main]

use libfuzzer_sys::fuzz_target;

use grove_tree::{ProcessExit, RunSession, Status};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut session = RunSession::default();
        for line in input.lines() {
            let _ = session.apply_line(line);
        }
        let report = session.finish(ProcessExit::Completed);
        assert_eq!(report.counts.running + report.counts.not_started, 0);

        let tree = session.tree();
        let tree = tree.read();
        if !tree.is_empty() {
            assert!(tree.root().status().is_terminal());
            assert_ne!(tree.root().status(), Status::Running);
        }
    }
});
