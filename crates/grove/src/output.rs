// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Printing the final tree and choosing the exit status

use std::io::{self, Write};

use grove_events::outcome::duration_display;
use grove_tree::{RunReport, Status, TestTree, render_tree, render_tree_compact};

use crate::config::OutputFormat;

/// Exit status when every reported test passed or was ignored
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status when at least one test failed
pub const EXIT_FAILED: u8 = 1;
/// Exit status when the run did not complete
pub const EXIT_INCOMPLETE: u8 = 2;

/// Process exit status for a finished run
///
/// A run that had to be terminated is never a success, even when every test
/// it did report passed.
#[must_use]
pub fn exit_code(report: &RunReport) -> u8 {
    match report.status {
        Status::Failed => EXIT_FAILED,
        Status::Terminated | Status::NotStarted | Status::Running => EXIT_INCOMPLETE,
        Status::Passed | Status::Ignored if report.termination.is_some() => EXIT_INCOMPLETE,
        Status::Passed | Status::Ignored => EXIT_SUCCESS,
    }
}

/// One-line account of a run, e.g. `3 passed; 1 failed; 0 ignored; finished in 2.50s`
#[must_use]
pub fn summary_line(report: &RunReport) -> String {
    let counts = &report.counts;
    let mut line = format!(
        "{} passed; {} failed; {} ignored",
        counts.passed, counts.failed, counts.ignored
    );
    if counts.terminated > 0 {
        line.push_str(&format!("; {} terminated", counts.terminated));
    }
    line.push_str(&format!("; finished in {}", duration_display(report.duration_ms)));
    if let Some(reason) = &report.termination {
        line.push_str(&format!(" ({reason})"));
    }
    line
}

/// Write the final tree in the requested format
///
/// # Errors
///
/// Returns an error if writing fails or the report cannot be serialized.
pub fn write_report<W: Write>(
    out: &mut W,
    report: &RunReport,
    tree: &TestTree,
    format: OutputFormat,
    compact: bool,
) -> io::Result<()> {
    match format {
        OutputFormat::Tree => {
            let rendered = if compact {
                render_tree_compact(tree)
            } else {
                render_tree(tree)
            };
            writeln!(out, "{rendered}")?;
            writeln!(out, "{}", summary_line(report))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
    }
    out.flush()
}
