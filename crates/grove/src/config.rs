// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Configuration for the grove command
//!
//! This module provides the command-line interface: where harness output
//! comes from, which tests the invocation selected, how location ids are
//! derived and how the final tree is printed.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use grove_events::EventsError;
use grove_tree::{RunConfig, RunScope, WorkspaceFingerprint};

/// Default capacity of the line queue between the reader and the tree
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// grove - rebuild a test tree from test harness output
///
/// Reads `cargo test` or `cargo nextest run --message-format libtest-json`
/// output, line by line, and prints the resulting tree of targets, modules
/// and tests with their statuses and durations.
#[derive(Parser, Debug, Clone)]
#[command(name = "grove")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Read harness output from a file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Target for test names printed before any `Running` banner
    #[arg(short, long, env = "GROVE_TARGET")]
    pub target: Option<String>,

    /// Workspace root, hashed into location ids
    ///
    /// Defaults to the current working directory.
    #[arg(short, long, env = "GROVE_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Build profile, hashed into location ids
    #[arg(long, default_value = "test")]
    pub profile: String,

    /// Only expect this test (`<target>::<path>`)
    #[arg(long, conflicts_with = "scope_module")]
    pub scope_test: Option<String>,

    /// Only expect tests below this module or target (`<target>[::<path>]`)
    #[arg(long)]
    pub scope_module: Option<String>,

    /// Seed the tree from `cargo nextest list --message-format json` output
    #[arg(long)]
    pub discovery: Option<PathBuf>,

    /// Terminate the run if no line arrives for this many seconds
    #[arg(long)]
    pub stall_timeout: Option<u64>,

    /// Capacity of the queue between the line reader and the tree
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Tree)]
    pub format: OutputFormat,

    /// Print a terminated run as a single `Test terminated` line
    #[arg(long, default_value = "false")]
    pub compact: bool,

    /// Protocol prefix for location ids (e.g. `cargo:`)
    #[arg(long, default_value = "")]
    pub location_prefix: String,

    /// Enable verbose logging (debug level)
    ///
    /// Logs are written to stderr so they never mix with the tree.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    ///
    /// Only errors and warnings will be logged.
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

/// How the final tree is printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One node per line with status markers, then a summary line
    #[default]
    Tree,
    /// The full run report as JSON
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            target: None,
            workspace: None,
            profile: "test".to_string(),
            scope_test: None,
            scope_module: None,
            discovery: None,
            stall_timeout: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            format: OutputFormat::Tree,
            compact: false,
            location_prefix: String::new(),
            verbose: false,
            quiet: false,
        }
    }
}

impl Config {
    /// Get the workspace path, using the current directory as default
    #[must_use]
    pub fn workspace_path(&self) -> PathBuf {
        self.workspace
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// The stall timeout, if one was requested
    #[must_use]
    pub fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout.map(Duration::from_secs)
    }

    /// The invocation scope named on the command line
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidScope` if a scope path is malformed.
    pub fn run_scope(&self) -> Result<RunScope, ConfigError> {
        let (path, scope) = match (&self.scope_test, &self.scope_module) {
            (Some(path), _) => (path, RunScope::test(path)),
            (None, Some(path)) => (path, RunScope::module(path)),
            (None, None) => return Ok(RunScope::Everything),
        };
        scope.map_err(|source| ConfigError::InvalidScope {
            path: path.clone(),
            source,
        })
    }

    /// Settings for the run session
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidScope` if a scope path is malformed.
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let mut config = RunConfig::default()
            .with_scope(self.run_scope()?)
            .with_workspace(WorkspaceFingerprint::new(
                self.workspace_path(),
                self.profile.clone(),
            ))
            .with_location_prefix(self.location_prefix.clone());
        if let Some(target) = &self.target {
            config = config.with_default_target(target.clone());
        }
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The workspace path is specified but doesn't exist or isn't a directory
    /// - The input or discovery file doesn't exist
    /// - A scope path is malformed
    /// - The stall timeout or queue capacity is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref workspace) = self.workspace {
            if !workspace.exists() {
                return Err(ConfigError::WorkspaceNotFound(workspace.clone()));
            }
            if !workspace.is_dir() {
                return Err(ConfigError::WorkspaceNotDirectory(workspace.clone()));
            }
        }

        for file in [&self.input, &self.discovery].into_iter().flatten() {
            if !file.is_file() {
                return Err(ConfigError::FileNotFound(file.clone()));
            }
        }

        if self.target.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::EmptyTarget);
        }
        if self.stall_timeout == Some(0) {
            return Err(ConfigError::ZeroStallTimeout);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }

        self.run_scope()?;
        Ok(())
    }

    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Workspace path not found
    #[error("Workspace path not found: {0}")]
    WorkspaceNotFound(PathBuf),

    /// Workspace path is not a directory
    #[error("Workspace path is not a directory: {0}")]
    WorkspaceNotDirectory(PathBuf),

    /// Input or discovery file not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A scope path could not be segmented
    #[error("Invalid scope {path:?}: {source}")]
    InvalidScope {
        /// The scope as given
        path: String,
        /// Why it was rejected
        #[source]
        source: EventsError,
    },

    /// The default target was set to an empty string
    #[error("Target name must not be empty")]
    EmptyTarget,

    /// A zero stall timeout would terminate every run immediately
    #[error("Stall timeout must be at least one second")]
    ZeroStallTimeout,

    /// The line queue needs room for at least one line
    #[error("Queue capacity must be at least 1")]
    ZeroQueueCapacity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.input.is_none());
        assert!(config.target.is_none());
        assert!(config.workspace.is_none());
        assert_eq!(config.profile, "test");
        assert_eq!(config.format, OutputFormat::Tree);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(!config.verbose);
        assert!(!config.quiet);
        assert!(!config.compact);
    }

    #[test]
    fn test_default_matches_parsed_defaults() {
        let parsed = Config::try_parse_from(["grove"]).expect("parse should succeed");
        let default = Config::default();
        assert_eq!(parsed.profile, default.profile);
        assert_eq!(parsed.queue_capacity, default.queue_capacity);
        assert_eq!(parsed.format, default.format);
        assert_eq!(parsed.location_prefix, default.location_prefix);
    }

    #[test]
    fn test_workspace_path_default() {
        let config = Config::default();
        assert!(!config.workspace_path().as_os_str().is_empty());
    }

    #[test]
    fn test_workspace_path_custom() {
        let custom = PathBuf::from("/tmp");
        let config = Config {
            workspace: Some(custom.clone()),
            ..Default::default()
        };
        assert_eq!(config.workspace_path(), custom);
    }

    #[test]
    fn test_log_level_default() {
        let config = Config::default();
        assert_eq!(config.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_log_level_verbose() {
        let config = Config {
            verbose: true,
            ..Default::default()
        };
        assert_eq!(config.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_log_level_quiet() {
        let config = Config {
            quiet: true,
            ..Default::default()
        };
        assert_eq!(config.log_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_run_scope() {
        let config = Config {
            scope_test: Some("pkg::b".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.run_scope().expect("scope"),
            RunScope::Test(vec!["pkg".to_string(), "b".to_string()])
        );

        let config = Config {
            scope_module: Some("pkg".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.run_scope().expect("scope"),
            RunScope::Target("pkg".to_string())
        );

        assert_eq!(
            Config::default().run_scope().expect("scope"),
            RunScope::Everything
        );
    }

    #[test]
    fn test_validate_nonexistent_workspace() {
        let config = Config {
            workspace: Some(PathBuf::from("/nonexistent/path/12345")),
            ..Default::default()
        };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::WorkspaceNotFound(_))));
    }

    #[test]
    fn test_validate_valid_workspace() {
        let config = Config {
            workspace: Some(PathBuf::from("/tmp")),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_input() {
        let config = Config {
            input: Some(PathBuf::from("/nonexistent/output.txt")),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_malformed_scope() {
        let config = Config {
            scope_test: Some("pkg::::b".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidScope { .. })
        ));
    }

    #[test]
    fn test_validate_zero_values() {
        let config = Config {
            stall_timeout: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroStallTimeout)));

        let config = Config {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroQueueCapacity)));

        let config = Config {
            target: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyTarget)));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Config::command().debug_assert();
    }
}
