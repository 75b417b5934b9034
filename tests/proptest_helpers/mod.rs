#![allow(dead_code)]

use std::path::PathBuf;

use labelrecords::ir::{BBoxXYXY, Pixel};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Distinct annotation-like file paths.
pub fn arb_file_list(max_len: usize) -> BoxedStrategy<Vec<PathBuf>> {
    (0..=max_len)
        .prop_map(|len| {
            (0..len)
                .map(|i| PathBuf::from(format!("dir/img_{i:04}.txt")))
                .collect()
        })
        .boxed()
}

/// Short lowercase class names, duplicates allowed.
pub fn arb_class_names(max_len: usize) -> BoxedStrategy<Vec<String>> {
    prop::collection::vec("[a-z]{1,6}", 0..=max_len).boxed()
}

/// Pixel boxes that may stick out of a `width` x `height` image.
pub fn arb_bbox_around(width: u32, height: u32) -> BoxedStrategy<BBoxXYXY<Pixel>> {
    let w = f64::from(width);
    let h = f64::from(height);
    (
        -w..2.0 * w,
        -h..2.0 * h,
        -w..2.0 * w,
        -h..2.0 * h,
    )
        .prop_map(|(x0, y0, x1, y1)| BBoxXYXY::from_xyxy(x0, y0, x1, y1))
        .boxed()
}
