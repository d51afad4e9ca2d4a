// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Line transport
//!
//! A reader pulls lines from harness output and hands them to the session
//! through a bounded channel, so a slow tree never lets the reader buffer
//! without limit. The session applies lines on the calling task, one at a
//! time, in arrival order.
//!
//! Async sources are read on a tokio task. Blocking sources such as stdin
//! are read on a dedicated thread: a blocked read cannot be cancelled, and
//! the run must still end on a stall or a shutdown while the writer keeps the
//! pipe open. The thread is left behind and dies with the process.

use std::future::Future;
use std::io::BufRead;
use std::thread;
use std::time::Duration;

use grove_tree::{ProcessExit, RunReport, RunSession};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_QUEUE_CAPACITY;

/// Transport settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Give up on the harness if no line arrives within this long
    pub stall_timeout: Option<Duration>,
    /// Capacity of the line queue; must be at least 1
    pub queue_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            stall_timeout: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

enum Next {
    Line(String),
    Closed,
    Stalled(Duration),
    Cancelled,
}

/// Feed every line of `reader` into `session` and finish the run
///
/// The run ends when the reader is exhausted, when no line arrives within
/// the stall timeout, or when `shutdown` resolves, whichever comes first.
pub async fn run<R, F>(
    session: &mut RunSession,
    reader: R,
    options: PipelineOptions,
    shutdown: F,
) -> RunReport
where
    R: AsyncBufRead + Unpin + Send + 'static,
    F: Future<Output = ()>,
{
    let (tx, rx) = mpsc::channel::<String>(options.queue_capacity.max(1));
    let reader_task = tokio::spawn(read_lines(reader, tx));
    let report = drive(session, rx, options, shutdown).await;
    reader_task.abort();
    report
}

/// Like [`run`], but for a blocking reader such as stdin
///
/// Lines are read on a dedicated thread, so the run ends on a stall or a
/// shutdown even while the read is still blocked.
pub async fn run_blocking<R, F>(
    session: &mut RunSession,
    reader: R,
    options: PipelineOptions,
    shutdown: F,
) -> RunReport
where
    R: BufRead + Send + 'static,
    F: Future<Output = ()>,
{
    let (tx, rx) = mpsc::channel::<String>(options.queue_capacity.max(1));
    let spawned = thread::Builder::new()
        .name("grove-reader".to_string())
        .spawn(move || read_lines_blocking(reader, &tx));
    if let Err(error) = spawned {
        warn!(%error, "could not start reader thread");
    }
    drive(session, rx, options, shutdown).await
}

async fn drive<F>(
    session: &mut RunSession,
    mut rx: mpsc::Receiver<String>,
    options: PipelineOptions,
    shutdown: F,
) -> RunReport
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let exit = loop {
        let next = tokio::select! {
            biased;
            () = &mut shutdown => Next::Cancelled,
            next = recv(&mut rx, options.stall_timeout) => next,
        };
        match next {
            Next::Line(line) => {
                session.apply_line(&line);
            }
            Next::Closed => break ProcessExit::Completed,
            Next::Stalled(after) => {
                warn!(timeout_secs = after.as_secs(), "harness output stalled");
                break ProcessExit::Stalled { after };
            }
            Next::Cancelled => {
                info!("run cancelled");
                break ProcessExit::Killed;
            }
        }
    };

    // Dropping the receiver unblocks a reader waiting on a full queue
    drop(rx);
    session.finish(exit)
}

async fn recv(rx: &mut mpsc::Receiver<String>, stall_timeout: Option<Duration>) -> Next {
    let received = match stall_timeout {
        Some(limit) => match tokio::time::timeout(limit, rx.recv()).await {
            Ok(received) => received,
            Err(_) => return Next::Stalled(limit),
        },
        None => rx.recv().await,
    };
    received.map_or(Next::Closed, Next::Line)
}

async fn read_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0usize;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                count += 1;
                if tx.send(line).await.is_err() {
                    debug!("line consumer went away");
                    break;
                }
            }
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "stopped reading harness output");
                break;
            }
        }
    }
    debug!(lines = count, "reader finished");
}

fn read_lines_blocking<R: BufRead>(reader: R, tx: &mpsc::Sender<String>) {
    let mut count = 0usize;
    for line in reader.lines() {
        match line {
            Ok(line) => {
                count += 1;
                if tx.blocking_send(line).is_err() {
                    debug!("line consumer went away");
                    break;
                }
            }
            Err(error) => {
                warn!(%error, "stopped reading harness output");
                break;
            }
        }
    }
    debug!(lines = count, "reader finished");
}
