//! Shard planning and shard writing.
//!
//! Each split's file list is dealt round-robin into at most `N` shards. Each
//! shard becomes one [`ShardTask`] that a single worker turns into one
//! `.record` file.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;
use serde::Serialize;

use crate::encode::{encode_record, EncodeOptions};
use crate::error::LabelRecordsError;
use crate::ir::io_tfrecord::TfRecordWriter;
use crate::labels::LabelMap;

/// Output record file extension.
pub const RECORD_EXTENSION: &str = "record";

/// Which split a shard belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Split {
    Train,
    Eval,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Eval => "eval",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The work for one output shard.
#[derive(Clone, Debug)]
pub struct ShardTask<'a> {
    /// Task identifier, e.g. `train-03`.
    pub id: String,
    /// Shared vocabulary; never mutated once tasks exist.
    pub labels: &'a LabelMap,
    /// Annotation files, written in this order.
    pub files: Vec<PathBuf>,
    /// Output record file.
    pub output_path: PathBuf,
}

/// What one shard writer produced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ShardResult {
    pub id: String,
    pub record_count: usize,
    pub class_counts: BTreeMap<String, usize>,
    pub negative_count: usize,
}

/// Number of shards for `len` files when `requested` are asked for.
///
/// Never zero for a non-empty list and never more than one shard per file.
pub fn effective_shard_count(len: usize, requested: usize) -> usize {
    if len == 0 {
        0
    } else {
        requested.clamp(1, len)
    }
}

/// Deals `items` into shards: `items[i]` goes to shard `i % count`.
pub fn partition_round_robin<T: Clone>(items: &[T], requested: usize) -> Vec<Vec<T>> {
    let count = effective_shard_count(items.len(), requested);
    let mut shards: Vec<Vec<T>> = vec![Vec::new(); count];
    for (i, item) in items.iter().enumerate() {
        shards[i % count].push(item.clone());
    }
    shards
}

/// Task identifier for shard `index` of `split`.
pub fn shard_id(split: Split, index: usize) -> String {
    format!("{}-{:02}", split, index)
}

/// Builds the tasks for one split, writing outputs into `out_dir`.
pub fn plan_shard_tasks<'a>(
    split: Split,
    files: &[PathBuf],
    requested: usize,
    out_dir: &Path,
    labels: &'a LabelMap,
) -> Vec<ShardTask<'a>> {
    partition_round_robin(files, requested)
        .into_iter()
        .enumerate()
        .map(|(index, files)| {
            let id = shard_id(split, index);
            let output_path = out_dir.join(format!("{id}.{RECORD_EXTENSION}"));
            ShardTask {
                id,
                labels,
                files,
                output_path,
            }
        })
        .collect()
}

/// Writes every file of `task` into its record file.
///
/// The first file that fails to encode aborts the shard. `cancel` is polled
/// before each file so a failure elsewhere stops this shard early.
pub fn write_shard(
    task: &ShardTask<'_>,
    opts: &EncodeOptions,
    cancel: &AtomicBool,
) -> Result<ShardResult, LabelRecordsError> {
    let write_err = |source| LabelRecordsError::RecordWrite {
        path: task.output_path.clone(),
        source,
    };

    let file = File::create(&task.output_path).map_err(write_err)?;
    let mut writer = TfRecordWriter::new(BufWriter::new(file));

    let mut result = ShardResult {
        id: task.id.clone(),
        ..Default::default()
    };

    for path in &task.files {
        if cancel.load(Ordering::Relaxed) {
            return Err(LabelRecordsError::Cancelled {
                task: task.id.clone(),
            });
        }

        info!("[{}] Writing record for {}", task.id, path.display());
        let record = encode_record(task.labels, path, opts)?;
        writer.write_example(&record.example).map_err(write_err)?;

        result.record_count += 1;
        if record.is_negative {
            result.negative_count += 1;
        }
        for (class_name, count) in record.class_counts {
            *result.class_counts.entry(class_name).or_insert(0) += count;
        }
    }

    writer.into_inner().map_err(write_err)?;
    Ok(result)
}
