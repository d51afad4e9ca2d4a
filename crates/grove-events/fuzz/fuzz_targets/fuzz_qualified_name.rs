// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for test identifier resolution
//!
//! Any identifier that parses must produce only non-empty segments.

#![no_main]

use libfuzzer_sys::fuzz_target;

use grove_events::QualifiedName;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(name) = QualifiedName::parse(input) {
            assert!(!name.segments().is_empty());
            assert!(name.segments().iter().all(|s| !s.is_empty() && !s.contains("::")));
        }
    }
});
