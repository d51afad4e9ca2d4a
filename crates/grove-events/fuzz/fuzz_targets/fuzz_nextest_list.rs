// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for nextest list output parsing
//!
//! This fuzzes `parse_list_output` which parses JSON from
//! `cargo nextest list --message-format json`.

#![no_main]

use libfuzzer_sys::fuzz_target;

use grove_events::parse_list_output;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(list) = parse_list_output(input) {
            let _ = list.discovered_tests();
        }
    }
});
