//! Summary report for a record conversion run.
//!
//! Shard results come back from the workers in submission order; this
//! module sums them and renders the per-shard and overall summary.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::shard::ShardResult;

/// The outcome of a successful conversion.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversionReport {
    /// Per-shard results, train shards first, in task order.
    pub shards: Vec<ShardResult>,
    /// Class names in id order.
    pub labels: Vec<String>,
    /// Path of the written label map.
    pub label_map_path: PathBuf,
    /// Totals across all shards.
    pub totals: ConversionTotals,
}

/// Sums across every shard.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConversionTotals {
    pub records: usize,
    pub class_counts: BTreeMap<String, usize>,
    pub negatives: usize,
}

impl ConversionTotals {
    /// Adds one shard's statistics.
    pub fn add(&mut self, shard: &ShardResult) {
        self.records += shard.record_count;
        self.negatives += shard.negative_count;
        for (class_name, count) in &shard.class_counts {
            *self.class_counts.entry(class_name.clone()).or_insert(0) += count;
        }
    }
}

impl ConversionReport {
    /// Builds the report from worker results.
    pub fn from_results(
        shards: Vec<ShardResult>,
        labels: Vec<String>,
        label_map_path: PathBuf,
    ) -> Self {
        let mut totals = ConversionTotals::default();
        for shard in &shards {
            totals.add(shard);
        }

        Self {
            shards,
            labels,
            label_map_path,
            totals,
        }
    }
}

struct Counts<'a>(&'a BTreeMap<String, usize>);

impl fmt::Display for Counts<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, count)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, count)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for shard in &self.shards {
            writeln!(
                f,
                "[{}] has {} records, {}",
                shard.id,
                shard.record_count,
                Counts(&shard.class_counts)
            )?;
        }

        writeln!(
            f,
            "Wrote {} labels to {}",
            self.labels.len(),
            self.label_map_path.display()
        )?;
        writeln!(f, "Overall records: {}", self.totals.records)?;
        writeln!(f, "Overall examples: {}", Counts(&self.totals.class_counts))?;
        writeln!(f, "Overall negatives: {}", self.totals.negatives)?;

        Ok(())
    }
}
