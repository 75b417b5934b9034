//! Fuzz target for rectangle text parsing.
//!
//! Feeds arbitrary UTF-8 to the annotation parser and the image path
//! directive lookup, checking for panics.

#![no_main]

use libfuzzer_sys::fuzz_target;
use labelrecords::ir::io_rects_txt::{from_rects_str, image_path_directive};

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = image_path_directive(text);
    if let Ok(annotation) = from_rects_str(text) {
        assert_eq!(annotation.boxes.len(), annotation.classes.len());
    }
});
