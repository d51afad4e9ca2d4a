// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! grove: rebuild a test tree from test harness output
//!
//! Pipe `cargo test` or `cargo nextest run --message-format libtest-json`
//! output into grove to get the tree of targets, modules and tests with
//! their statuses, durations and location ids.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use grove::config::Config;
use grove::output::{exit_code, write_report};
use grove::pipeline::{self, PipelineOptions};
use grove_events::load_list_file;
use grove_tree::RunSession;
use tokio::io::BufReader;
use tracing::{debug, info};

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = Config::parse();

    // Logs go to stderr so they never mix with the tree on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_level().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    config.validate()?;
    debug!(?config, "configuration");

    let mut session = RunSession::new(config.run_config()?);
    if let Some(path) = &config.discovery {
        let list = load_list_file(path)
            .with_context(|| format!("Failed to load discovery index {}", path.display()))?;
        let seeded = session.seed_from(&list);
        info!(seeded, listed = list.listed_count(), "loaded discovery index");
    }

    let options = PipelineOptions {
        stall_timeout: config.stall_timeout(),
        queue_capacity: config.queue_capacity,
    };
    let report = match &config.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            pipeline::run(&mut session, BufReader::new(file), options, shutdown_signal()).await
        }
        None => {
            let stdin = std::io::BufReader::new(std::io::stdin());
            pipeline::run_blocking(&mut session, stdin, options, shutdown_signal()).await
        }
    };

    let tree = session.tree();
    let mut stdout = std::io::stdout().lock();
    write_report(&mut stdout, &report, &tree.read(), config.format, config.compact)
        .context("Failed to write report")?;

    Ok(ExitCode::from(exit_code(&report)))
}
