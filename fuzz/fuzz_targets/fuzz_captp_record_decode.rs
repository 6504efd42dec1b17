// Copyright (c) 2026 Amunchain
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use captp_harness::captp::Op;
use captp_harness::codec::decode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any Syrup value that decodes must parse as a CapTP op without
    // panicking, even if it is not a well-formed one.
    if let Ok(value) = decode(data) {
        let _ = Op::from_value(&value);
    }
});
