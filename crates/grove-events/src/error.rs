// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for grove-events

use thiserror::Error;

/// Errors that can occur while decoding harness output
#[derive(Debug, Error)]
pub enum EventsError {
    /// A line looked like libtest JSON but could not be decoded
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Error reading harness output or a discovery file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A test identifier could not be split into path segments
    #[error("Malformed test identifier: {identifier:?}")]
    MalformedIdentifier {
        /// The identifier as it appeared in the harness output
        identifier: String,
    },

    /// A recognized line carried a value of the wrong shape
    #[error("Invalid harness output format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },
}

impl EventsError {
    /// Shorthand for a [`EventsError::MalformedIdentifier`]
    #[must_use]
    pub fn malformed(identifier: &str) -> Self {
        Self::MalformedIdentifier {
            identifier: identifier.to_string(),
        }
    }
}
