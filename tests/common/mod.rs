#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use labelrecords::ir::io_tfrecord::{read_tfrecord_file, Example};

pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    RgbImage::new(width, height).save(path).expect("write png file");
}

/// Writes `<dir>/<stem>.png` and `<dir>/<stem>.txt` with the given box lines.
pub fn write_labeled_image(dir: &Path, stem: &str, lines: &[&str]) -> PathBuf {
    write_png(&dir.join(format!("{stem}.png")), 32, 24);
    let annotation = dir.join(format!("{stem}.txt"));
    let mut content = String::new();
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(&annotation, content).expect("write annotation file");
    annotation
}

/// Ten images with one `cat` each plus five negatives.
pub fn create_cat_dataset(root: &Path) {
    for i in 0..10 {
        write_labeled_image(root, &format!("cat_{i:02}"), &["2,3,10,8,cat"]);
    }
    for i in 0..5 {
        write_labeled_image(root, &format!("empty_{i:02}"), &[]);
    }
}

/// Sorted list of `.record` files in `dir`.
pub fn record_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .expect("read output dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "record"))
        .collect();
    files.sort();
    files
}

/// Reads every example from every record file in `dir`.
pub fn read_all_examples(dir: &Path) -> Vec<Example> {
    record_files(dir)
        .iter()
        .flat_map(|path| read_tfrecord_file(path).expect("read record file"))
        .collect()
}
