//! Fuzz target for TFRecord decoding.
//!
//! Truncated frames, bad checksums and malformed protobuf payloads must come
//! back as errors, never panics or unbounded allocations.

#![no_main]

use libfuzzer_sys::fuzz_target;
use labelrecords::ir::io_tfrecord::from_tfrecord_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_tfrecord_slice(data);
});
