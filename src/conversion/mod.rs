//! End-to-end conversion of an annotated folder into record shards.
//!
//! The pipeline runs in a fixed order:
//!
//! 1. discover and shuffle the annotation files,
//! 2. plan the train/eval split,
//! 3. build the label map over train and eval together,
//! 4. deal each split into shard tasks,
//! 5. write all shards on a worker pool,
//! 6. write the label map, only once every shard succeeded.

pub mod report;

pub use report::{ConversionReport, ConversionTotals};

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;

use crate::discovery::discover_annotations;
use crate::encode::{EncodeOptions, DEFAULT_IMAGE_EXTENSION};
use crate::error::LabelRecordsError;
use crate::labels::{build_label_map, write_label_map};
use crate::shard::{plan_shard_tasks, write_shard, ShardResult, ShardTask, Split};
use crate::split::{plan_split, validate_eval_source, EvalSource};

/// Default number of shards per split.
pub const DEFAULT_SHARDS: usize = 10;

/// Default shuffle seed.
pub const DEFAULT_SEED: u64 = 42;

/// Options for a conversion run.
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Folder with the training annotations; all output is written here.
    pub folder: PathBuf,
    /// Requested shards per split.
    pub shards: usize,
    /// Where the eval set comes from.
    pub eval_source: EvalSource,
    /// Seed for the discovery shuffle.
    pub seed: u64,
    /// Worker threads; `None` uses one per CPU.
    pub jobs: Option<usize>,
    /// Extension of the image paired with each annotation file.
    pub image_extension: String,
}

impl ConvertOptions {
    /// Options with defaults for everything but the folder.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            shards: DEFAULT_SHARDS,
            eval_source: EvalSource::None,
            seed: DEFAULT_SEED,
            jobs: None,
            image_extension: DEFAULT_IMAGE_EXTENSION.to_string(),
        }
    }
}

/// Validate conversion options before running.
pub fn validate_convert_options(opts: &ConvertOptions) -> Result<(), LabelRecordsError> {
    validate_eval_source(&opts.eval_source)?;

    if opts.jobs == Some(0) {
        return Err(LabelRecordsError::InvalidOptions {
            message: "--jobs must be greater than 0".to_string(),
        });
    }

    let ext = opts.image_extension.trim_start_matches('.');
    if ext.is_empty() {
        return Err(LabelRecordsError::InvalidOptions {
            message: "--image-ext must not be empty".to_string(),
        });
    }

    Ok(())
}

/// Runs the whole conversion and returns the summary.
pub fn convert_folder(opts: &ConvertOptions) -> Result<ConversionReport, LabelRecordsError> {
    validate_convert_options(opts)?;

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let train_files = discover_annotations(&opts.folder, &mut rng)?;
    let plan = plan_split(train_files, &opts.eval_source, &mut rng)?;

    let labels = build_label_map(&plan.all_files())?;

    let mut tasks = plan_shard_tasks(Split::Train, &plan.train, opts.shards, &opts.folder, &labels);
    tasks.extend(plan_shard_tasks(
        Split::Eval,
        &plan.eval,
        opts.shards,
        &opts.folder,
        &labels,
    ));
    info!("Created {} shard task(s)", tasks.len());

    let encode_opts = EncodeOptions {
        image_extension: opts.image_extension.trim_start_matches('.').to_string(),
    };
    let results = run_shard_tasks(&tasks, &encode_opts, opts.jobs)?;

    let label_map_path = write_label_map(&opts.folder, &labels)?;
    Ok(ConversionReport::from_results(
        results,
        labels.names().to_vec(),
        label_map_path,
    ))
}

/// Writes every shard on a worker pool and gathers results in task order.
///
/// The first failing shard raises a shared cancel flag; shards still running
/// stop at their next file. The error returned is the first real failure in
/// task order, never a cancellation.
pub fn run_shard_tasks(
    tasks: &[ShardTask<'_>],
    opts: &EncodeOptions,
    jobs: Option<usize>,
) -> Result<Vec<ShardResult>, LabelRecordsError> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder.build()?;

    let cancel = AtomicBool::new(false);
    let outcomes: Vec<Result<ShardResult, LabelRecordsError>> = pool.install(|| {
        tasks
            .par_iter()
            .map(|task| {
                let outcome = write_shard(task, opts, &cancel);
                if outcome.is_err() {
                    cancel.store(true, Ordering::Relaxed);
                }
                outcome
            })
            .collect()
    });

    let mut results = Vec::with_capacity(outcomes.len());
    let mut cancelled = None;
    for outcome in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(err @ LabelRecordsError::Cancelled { .. }) => {
                cancelled.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }

    match cancelled {
        Some(err) => Err(err),
        None => Ok(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let opts = ConvertOptions::new("data");
        assert_eq!(opts.shards, 10);
        assert_eq!(opts.seed, 42);
        assert_eq!(opts.eval_source, EvalSource::None);
        assert_eq!(opts.image_extension, "png");
    }

    #[test]
    fn validate_rejects_bad_options() {
        let mut opts = ConvertOptions::new("data");
        opts.jobs = Some(0);
        assert!(validate_convert_options(&opts).is_err());

        let mut opts = ConvertOptions::new("data");
        opts.image_extension = ".".to_string();
        assert!(validate_convert_options(&opts).is_err());

        let mut opts = ConvertOptions::new("data");
        opts.eval_source = EvalSource::AutoSplit { fraction: 2.0 };
        assert!(validate_convert_options(&opts).is_err());

        assert!(validate_convert_options(&ConvertOptions::new("data")).is_ok());
    }

    #[test]
    fn no_tasks_gives_no_results() {
        let results = run_shard_tasks(&[], &EncodeOptions::default(), Some(1)).unwrap();
        assert!(results.is_empty());
    }
}
