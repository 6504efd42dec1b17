// Copyright (c) 2026 Amunchain
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Best-effort: the Syrup decoder must never panic on arbitrary bytes,
    // only return a CodecError.
    let _ = captp_harness::codec::decode(data);
});
