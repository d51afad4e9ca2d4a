// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for harness line decoding
//!
//! This fuzzes `decode_transcript`, which runs every line through both the
//! libtest JSON and the human-readable grammars.

#![no_main]

use libfuzzer_sys::fuzz_target;

use grove_events::decode_transcript;

fuzz_target!(|data: &[u8]| {
    // Convert bytes to string - invalid UTF-8 should be handled gracefully
    if let Ok(input) = std::str::from_utf8(data) {
        // decode_transcript should never panic on any input
        let _ = decode_transcript(input);
    }
});
