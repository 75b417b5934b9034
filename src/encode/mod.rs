//! Record encoding: one annotated image in, one `tf.train.Example` out.
//!
//! The feature keys follow the TensorFlow Object Detection API's
//! `TfExampleDecoder` so the shards can be fed to its input pipeline
//! unchanged.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, ImageReader};
use log::debug;

use crate::error::LabelRecordsError;
use crate::ir::io_rects_txt::{image_path_directive, parse_rects, read_annotation_text};
use crate::ir::io_tfrecord::{Example, Feature};
use crate::ir::AnnotatedImage;
use crate::labels::LabelMap;

pub const KEY_HEIGHT: &str = "image/height";
pub const KEY_WIDTH: &str = "image/width";
pub const KEY_CHANNELS: &str = "image/channels";
pub const KEY_COLORSPACE: &str = "image/colorspace";
pub const KEY_FILENAME: &str = "image/filename";
pub const KEY_SOURCE_ID: &str = "image/source_id";
pub const KEY_IMAGE_KEY: &str = "image/image_key";
pub const KEY_ENCODED: &str = "image/encoded";
pub const KEY_FORMAT: &str = "image/format";
pub const KEY_XMIN: &str = "image/object/bbox/xmin";
pub const KEY_XMAX: &str = "image/object/bbox/xmax";
pub const KEY_YMIN: &str = "image/object/bbox/ymin";
pub const KEY_YMAX: &str = "image/object/bbox/ymax";
pub const KEY_CLASS_TEXT: &str = "image/object/class/text";
pub const KEY_CLASS_LABEL: &str = "image/object/class/label";

/// Colorspace tag written on every record.
pub const COLORSPACE: &str = "RGB";

/// Format tag of the re-encoded image payload.
pub const ENCODED_FORMAT: &str = "png";

/// Default extension of the image paired with an annotation file.
pub const DEFAULT_IMAGE_EXTENSION: &str = "png";

/// Options for record encoding.
#[derive(Clone, Debug)]
pub struct EncodeOptions {
    /// Extension used to derive the image path from the annotation path.
    pub image_extension: String,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            image_extension: DEFAULT_IMAGE_EXTENSION.to_string(),
        }
    }
}

/// One encoded record plus the statistics it contributes.
#[derive(Clone, Debug)]
pub struct EncodedRecord {
    pub example: Example,
    /// Occurrences of each class in this image.
    pub class_counts: BTreeMap<String, usize>,
    /// True if the image has no labeled objects.
    pub is_negative: bool,
}

/// Picks the image that belongs to an annotation file.
///
/// A first line of the form `#<path>` wins when `<path>` is an existing
/// file, tried as given and then relative to the annotation's directory.
/// Otherwise the image is the annotation path with its extension replaced.
pub fn resolve_image_path(annotation_path: &Path, content: &str, image_extension: &str) -> PathBuf {
    if let Some(directive) = image_path_directive(content) {
        let candidate = PathBuf::from(directive);
        if candidate.is_file() {
            debug!("Found image path {} in the first line", candidate.display());
            return candidate;
        }
        if candidate.is_relative() {
            if let Some(sibling) = annotation_path.parent().map(|dir| dir.join(&candidate)) {
                if sibling.is_file() {
                    debug!("Found image path {} in the first line", sibling.display());
                    return sibling;
                }
            }
        }
        debug!(
            "First line of {} does not name an existing image; deriving from file name",
            annotation_path.display()
        );
    }

    annotation_path.with_extension(image_extension)
}

/// Reads an annotation file and resolves its image.
pub fn load_annotated_image(
    annotation_path: &Path,
    opts: &EncodeOptions,
) -> Result<AnnotatedImage, LabelRecordsError> {
    let content = read_annotation_text(annotation_path)?;
    let image_path = resolve_image_path(annotation_path, &content, &opts.image_extension);
    let annotation = parse_rects(&content, annotation_path)?;

    Ok(AnnotatedImage {
        annotation_path: annotation_path.to_path_buf(),
        image_path,
        annotation,
    })
}

/// Encodes one annotation file and its image into a record.
pub fn encode_record(
    labels: &LabelMap,
    annotation_path: &Path,
    opts: &EncodeOptions,
) -> Result<EncodedRecord, LabelRecordsError> {
    let annotated = load_annotated_image(annotation_path, opts)?;
    let image = decode_image(&annotated.image_path)?;
    let encoded = encode_png(&image, &annotated.image_path)?;
    build_record(labels, &annotated, &image, encoded)
}

fn decode_image(path: &Path) -> Result<DynamicImage, LabelRecordsError> {
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|source| LabelRecordsError::ImageOpen {
            path: path.to_path_buf(),
            source,
        })?;

    reader
        .decode()
        .map_err(|source| LabelRecordsError::ImageDecode {
            path: path.to_path_buf(),
            source,
        })
}

fn encode_png(image: &DynamicImage, path: &Path) -> Result<Vec<u8>, LabelRecordsError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|source| LabelRecordsError::ImageEncode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(bytes)
}

/// Assembles the record from a decoded image and its annotation.
pub fn build_record(
    labels: &LabelMap,
    annotated: &AnnotatedImage,
    image: &DynamicImage,
    encoded_png: Vec<u8>,
) -> Result<EncodedRecord, LabelRecordsError> {
    let width = image.width();
    let height = image.height();
    let channels = image.color().channel_count();

    let annotation = &annotated.annotation;
    let count = annotation.boxes.len();
    let mut xmins = Vec::with_capacity(count);
    let mut xmaxs = Vec::with_capacity(count);
    let mut ymins = Vec::with_capacity(count);
    let mut ymaxs = Vec::with_capacity(count);
    let mut class_text = Vec::with_capacity(count);
    let mut class_ids = Vec::with_capacity(count);
    let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();

    for (bbox, class_name) in annotation.objects() {
        let id = labels
            .id(class_name)
            .ok_or_else(|| LabelRecordsError::UnknownClass {
                path: annotated.annotation_path.clone(),
                class_name: class_name.to_string(),
            })?;

        let norm = bbox.to_normalized_clamped(width, height);
        xmins.push(norm.xmin as f32);
        xmaxs.push(norm.xmax as f32);
        ymins.push(norm.ymin as f32);
        ymaxs.push(norm.ymax as f32);
        class_text.push(class_name.as_bytes().to_vec());
        class_ids.push(id as i64);
        *class_counts.entry(class_name.to_string()).or_insert(0) += 1;
    }

    let filename = annotated.image_path.to_string_lossy().into_owned();

    let example = Example::from_features([
        (KEY_HEIGHT, Feature::int64(i64::from(height))),
        (KEY_WIDTH, Feature::int64(i64::from(width))),
        (KEY_CHANNELS, Feature::int64(i64::from(channels))),
        (KEY_COLORSPACE, Feature::bytes(COLORSPACE)),
        (KEY_FILENAME, Feature::bytes(filename.as_str())),
        (KEY_SOURCE_ID, Feature::bytes(filename.as_str())),
        (KEY_IMAGE_KEY, Feature::bytes(filename.as_str())),
        (KEY_ENCODED, Feature::bytes(encoded_png)),
        (KEY_FORMAT, Feature::bytes(ENCODED_FORMAT)),
        (KEY_XMIN, Feature::float_list(xmins)),
        (KEY_XMAX, Feature::float_list(xmaxs)),
        (KEY_YMIN, Feature::float_list(ymins)),
        (KEY_YMAX, Feature::float_list(ymaxs)),
        (KEY_CLASS_TEXT, Feature::bytes_list(class_text)),
        (KEY_CLASS_LABEL, Feature::int64_list(class_ids)),
    ]);

    Ok(EncodedRecord {
        example,
        class_counts,
        is_negative: annotation.is_negative(),
    })
}
