//! Per-image annotation model.

use std::path::{Path, PathBuf};

use super::bbox::BBoxXYXY;
use super::space::Pixel;
use crate::error::LabelRecordsError;

/// The labeled boxes of one image, as read from one annotation file.
///
/// `boxes` and `classes` are parallel: `classes[i]` names the object in
/// `boxes[i]`. An annotation without boxes is a negative example.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Annotation {
    /// Pixel-space boxes in XYXY order.
    pub boxes: Vec<BBoxXYXY<Pixel>>,
    /// Class name for each box.
    pub classes: Vec<String>,
}

impl Annotation {
    /// Builds an annotation, rejecting box/class lists of different lengths.
    pub fn new(
        path: &Path,
        boxes: Vec<BBoxXYXY<Pixel>>,
        classes: Vec<String>,
    ) -> Result<Self, LabelRecordsError> {
        if boxes.len() != classes.len() {
            return Err(LabelRecordsError::AnnotationMismatch {
                path: path.to_path_buf(),
                boxes: boxes.len(),
                classes: classes.len(),
            });
        }
        Ok(Self { boxes, classes })
    }

    /// Returns true if the image has no labeled objects.
    pub fn is_negative(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Iterates over `(box, class)` pairs.
    pub fn objects(&self) -> impl Iterator<Item = (&BBoxXYXY<Pixel>, &str)> {
        self.boxes
            .iter()
            .zip(self.classes.iter().map(String::as_str))
    }
}

/// An annotation file together with the image it describes.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedImage {
    pub annotation_path: PathBuf,
    pub image_path: PathBuf,
    pub annotation: Annotation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_length_mismatch() {
        let err = Annotation::new(
            Path::new("a.txt"),
            vec![BBoxXYXY::from_xyxy(0.0, 0.0, 1.0, 1.0)],
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LabelRecordsError::AnnotationMismatch {
                boxes: 1,
                classes: 0,
                ..
            }
        ));
    }

    #[test]
    fn empty_annotation_is_negative() {
        let ann = Annotation::new(Path::new("a.txt"), Vec::new(), Vec::new()).unwrap();
        assert!(ann.is_negative());
        assert_eq!(ann.objects().count(), 0);
    }
}
