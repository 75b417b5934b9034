//! Reader and writer for the per-image rectangle text format.
//!
//! Each labeled image `foo.png` is paired with `foo.txt`. The text file
//! holds one box per line:
//!
//! ```text
//! #/data/raw/foo.png
//! 12,40,100,80,cat
//! 300,10,25,25,traffic cone
//! ```
//!
//! - Lines starting with `#` are comments. A `#` on the first line may name
//!   the image explicitly (see [`image_path_directive`]).
//! - Box lines are `x,y,w,h,class` with `(x, y)` the top-left corner in
//!   pixels. The class is everything after the fourth comma.
//! - Blank lines are ignored.
//!
//! Boxes are returned in XYXY order: `[x, y, x + w, y + h]`.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::bbox::BBoxXYXY;
use super::model::Annotation;
use super::space::Pixel;
use crate::error::LabelRecordsError;

/// Leading character of comment lines and of the image path directive.
pub const IMAGE_PATH_MARKER: char = '#';

/// Reads an annotation file from disk.
pub fn read_rects_txt(path: &Path) -> Result<Annotation, LabelRecordsError> {
    let content = read_annotation_text(path)?;
    parse_rects(&content, path)
}

/// Reads the raw text of an annotation file.
///
/// Unreadable or non-UTF-8 files are reported with their path.
pub fn read_annotation_text(path: &Path) -> Result<String, LabelRecordsError> {
    fs::read_to_string(path).map_err(|source| LabelRecordsError::AnnotationRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses annotation text that was already read into memory.
///
/// `path` is only used for error messages.
pub fn parse_rects(content: &str, path: &Path) -> Result<Annotation, LabelRecordsError> {
    let mut boxes = Vec::new();
    let mut classes = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        let Some((bbox, class_name)) = parse_rect_line(line, path, line_idx + 1)? else {
            continue;
        };
        boxes.push(bbox);
        classes.push(class_name);
    }

    Annotation::new(path, boxes, classes)
}

/// Parses annotation text from a string.
///
/// Useful for tests and fuzzing.
pub fn from_rects_str(content: &str) -> Result<Annotation, LabelRecordsError> {
    parse_rects(content, Path::new("<string>"))
}

/// Returns the path named by a leading `#<path>` line, if any.
///
/// Only the syntax is checked here; whether the file exists is up to the
/// caller.
pub fn image_path_directive(content: &str) -> Option<&str> {
    let first = content.lines().next()?.trim();
    let rest = first.strip_prefix(IMAGE_PATH_MARKER)?.trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Renders an annotation in the rectangle text format.
///
/// When `image_path` is given it is written as the leading directive line.
pub fn to_rects_txt_string(annotation: &Annotation, image_path: Option<&Path>) -> String {
    let mut out = String::new();
    if let Some(image_path) = image_path {
        let _ = writeln!(out, "{}{}", IMAGE_PATH_MARKER, image_path.display());
    }
    for (bbox, class_name) in annotation.objects() {
        let (x, y, w, h) = bbox.to_xywh();
        let _ = writeln!(out, "{},{},{},{},{}", x, y, w, h, class_name);
    }
    out
}

fn parse_rect_line(
    line: &str,
    path: &Path,
    line_num: usize,
) -> Result<Option<(BBoxXYXY<Pixel>, String)>, LabelRecordsError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(IMAGE_PATH_MARKER) {
        return Ok(None);
    }

    let fields: Vec<&str> = trimmed.splitn(5, ',').collect();
    if fields.len() < 5 {
        return Err(LabelRecordsError::RectsParse {
            path: path.to_path_buf(),
            line: line_num,
            message: format!(
                "expected 'x,y,w,h,class', found {} field(s)",
                fields.len()
            ),
        });
    }

    let x = parse_coord(fields[0], "x", path, line_num)?;
    let y = parse_coord(fields[1], "y", path, line_num)?;
    let w = parse_coord(fields[2], "w", path, line_num)?;
    let h = parse_coord(fields[3], "h", path, line_num)?;

    let class_name = fields[4].trim();
    if class_name.is_empty() {
        return Err(LabelRecordsError::RectsParse {
            path: path.to_path_buf(),
            line: line_num,
            message: "class name is empty".to_string(),
        });
    }

    let bbox = BBoxXYXY::from_xywh(x, y, w, h);
    if !bbox.is_finite() {
        return Err(LabelRecordsError::RectsParse {
            path: path.to_path_buf(),
            line: line_num,
            message: "box corner overflows a finite coordinate".to_string(),
        });
    }

    Ok(Some((bbox, class_name.to_string())))
}

fn parse_coord(
    raw: &str,
    field_name: &str,
    path: &Path,
    line_num: usize,
) -> Result<f64, LabelRecordsError> {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(LabelRecordsError::RectsParse {
            path: path.to_path_buf(),
            line: line_num,
            message: format!("invalid {field_name} '{raw}'; expected a finite number"),
        }),
    }
}
