use std::path::PathBuf;
use thiserror::Error;

/// The main error type for labelrecords operations.
#[derive(Debug, Error)]
pub enum LabelRecordsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid options: {message}")]
    InvalidOptions { message: String },

    #[error("Failed to read folder {path}: {source}")]
    FolderUnreadable {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read annotation {path}: {source}")]
    AnnotationRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path} line {line}: {message}")]
    RectsParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Annotation {path} has {boxes} box(es) but {classes} class name(s)")]
    AnnotationMismatch {
        path: PathBuf,
        boxes: usize,
        classes: usize,
    },

    #[error("Class '{class_name}' in {path} is not in the label map")]
    UnknownClass { path: PathBuf, class_name: String },

    #[error("Failed to open image {path}: {source}")]
    ImageOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image {path}: {source}")]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write records to {path}: {source}")]
    RecordWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read records from {path}: {source}")]
    RecordRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TFRecord data in {path} at record {index}: {message}")]
    RecordParse {
        path: PathBuf,
        index: usize,
        message: String,
    },

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Shard {task} was cancelled after another shard failed")]
    Cancelled { task: String },

    #[error("Failed to serialize report: {0}")]
    ReportJson(#[from] serde_json::Error),
}
