// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! grove library
//!
//! This module exports the command's configuration, line transport and
//! output handling for use in integration tests and as a library.

pub mod config;
pub mod output;
pub mod pipeline;
