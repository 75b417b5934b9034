//! labelrecords: turn a folder of labeled images into TFRecord shards.
//!
//! Labeling tools store each annotated image as an image plus a `.txt` file
//! of rectangles. Training pipelines built on the TensorFlow Object
//! Detection API expect sharded TFRecord files and a `label.pbtxt` label
//! map instead. This crate converts the former into the latter, optionally
//! carving out an eval split.
//!
//! # Modules
//!
//! - [`ir`]: annotation types, the rectangle text reader and the TFRecord codec
//! - [`discovery`]: finding annotation files
//! - [`split`]: train/eval split planning
//! - [`labels`]: the label vocabulary and manifest
//! - [`shard`]: shard planning and shard writing
//! - [`encode`]: building one `tf.train.Example` per image
//! - [`conversion`]: the end-to-end pipeline and its report
//! - [`error`]: error types

pub mod conversion;
pub mod discovery;
pub mod encode;
pub mod error;
pub mod ir;
pub mod labels;
pub mod shard;
pub mod split;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};

pub use error::LabelRecordsError;

use conversion::{ConvertOptions, DEFAULT_SEED, DEFAULT_SHARDS};
use split::EvalSource;

const ABOUT: &str = "Convert labeled images into TFRecord files for training.";

const LONG_ABOUT: &str = "\
Convert labeled images into TFRecord files for training.

Labeling tools store annotated images as an image with a corresponding .txt
file containing labels. This command converts those pairs into the sharded
TFRecord format the TensorFlow Object Detection API expects. It can also
generate an evaluation split automatically or take one from a separate folder.
The label map required by the Object Detection API is written into the folder
as label.pbtxt.";

const AFTER_HELP: &str = "\
Examples:
  labelrecords data/            convert without eval
  labelrecords data/ --eval     generate an eval split";

/// The labelrecords CLI application.
#[derive(Parser)]
#[command(name = "labelrecords")]
#[command(version, about = ABOUT, long_about = LONG_ABOUT, after_help = AFTER_HELP)]
struct Cli {
    /// Folder containing training data. All converted data is written here.
    folder: PathBuf,

    /// Number of record shards per split.
    #[arg(short = 'n', long = "number", default_value_t = DEFAULT_SHARDS)]
    number: usize,

    /// Fraction of training data to use for eval with --eval.
    #[arg(short = 's', long = "split", default_value_t = 0.15, value_parser = parse_fraction)]
    split: f64,

    /// Automatically generate an eval split from the training folder.
    #[arg(short = 'e', long = "eval", conflicts_with = "eval_folder")]
    eval: bool,

    /// Folder containing eval data.
    #[arg(long = "eval-folder", visible_alias = "eval_folder")]
    eval_folder: Option<PathBuf>,

    /// Seed for the file shuffle.
    #[arg(long, env = "LABELRECORDS_SEED", default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Number of worker threads (default: one per CPU).
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Extension of the image paired with each annotation file.
    #[arg(long = "image-ext", default_value = encode::DEFAULT_IMAGE_EXTENSION)]
    image_ext: String,

    /// Output format for the summary.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

/// Summary output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn parse_fraction(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(value) if (0.0..=1.0).contains(&value) => Ok(value),
        _ => Err("split must be between 0.0 and 1.0".to_string()),
    }
}

impl Cli {
    fn into_options(self) -> (ConvertOptions, ReportFormat) {
        let eval_source = match (self.eval_folder, self.eval) {
            (Some(folder), _) => EvalSource::Folder(folder),
            (None, true) => EvalSource::AutoSplit {
                fraction: self.split,
            },
            (None, false) => EvalSource::None,
        };

        let opts = ConvertOptions {
            folder: self.folder,
            shards: self.number,
            eval_source,
            seed: self.seed,
            jobs: self.jobs,
            image_extension: self.image_ext,
        };
        (opts, self.output)
    }
}

/// Run the labelrecords CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LabelRecordsError> {
    let started = Instant::now();
    let (opts, output) = Cli::parse().into_options();

    let report = conversion::convert_folder(&opts)?;

    match output {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportFormat::Text => print!("{}", report),
    }

    log::info!(
        "Took {:.2}s to write records",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
