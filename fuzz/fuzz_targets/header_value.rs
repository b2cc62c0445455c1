//! Fuzz target for header value decoding and range checks.
//!
//! Run with: cargo +nightly fuzz run header_value

#![no_main]

use libfuzzer_sys::fuzz_target;
use tagsplice::structure::{Endianness, HeaderValue};

fuzz_target!(|data: &[u8]| {
    let Some((&flags, bytes)) = data.split_first() else {
        return;
    };
    let signed = flags & 1 != 0;
    let endianness = if flags & 2 != 0 {
        Endianness::Big
    } else {
        Endianness::Little
    };

    // Only 1, 2, 4 and 8 byte widths decode.
    let Ok(value) = HeaderValue::decode(bytes, signed, endianness) else {
        return;
    };
    assert_eq!(value.encode(endianness), bytes);

    let raw = value.get();
    assert_eq!(value.with_value(raw), Some(value));
    assert_eq!(HeaderValue::from_raw(bytes.len(), signed, raw).ok(), Some(value));
});
