//! Fuzz target for in-place stream resizing.
//!
//! Interprets the input as a sequence of lengthen/shorten/move operations
//! and checks every result against the same edit done on a plain `Vec`.
//!
//! Run with: cargo +nightly fuzz run stream_surgery

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use tagsplice::stream::StreamSurgeon;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let surgeon = StreamSurgeon::new(data[0] as usize % 17 + 1);
    let mut model: Vec<u8> = (0..=255u8).cycle().take(300).collect();
    let mut stream = Cursor::new(model.clone());

    for op in data[1..].chunks_exact(4) {
        let len = model.len();
        let a = op[1] as usize * len / 256;
        let b = op[2] as usize * len / 256;
        let n = op[3] as usize % 64;

        match op[0] % 3 {
            0 => {
                let n = n.min(4096 - len.min(4096));
                surgeon.lengthen(&mut stream, a as u64, n as u64, true).unwrap();
                model.splice(a..a, std::iter::repeat_n(0, n));
            }
            1 => {
                let n = n.min(a);
                surgeon.shorten(&mut stream, a as u64, n as u64).unwrap();
                model.drain(a - n..a);
            }
            _ => {
                let n = n.min(len - a.max(b));
                surgeon
                    .move_within_stream(&mut stream, a as u64, b as u64, n as u64)
                    .unwrap();
                model.copy_within(a..a + n, b);
            }
        }
        assert_eq!(stream.get_ref(), &model);
    }
});
