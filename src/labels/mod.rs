//! Label vocabulary and the label map manifest.
//!
//! Class ids are assigned by sorting the distinct class names, so two runs
//! over the same annotation content produce the same ids no matter which
//! order the files were discovered in.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::LabelRecordsError;
use crate::ir::io_rects_txt::read_rects_txt;

/// File name of the label map written next to the record shards.
pub const LABEL_MAP_FILE_NAME: &str = "label.pbtxt";

/// An immutable class-name to id mapping.
///
/// Ids are zero-based and contiguous (`0..len`). The manifest stores them
/// one-indexed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelMap {
    names: Vec<String>,
}

impl LabelMap {
    /// Builds a label map from any collection of class names.
    ///
    /// Duplicates are collapsed; ids follow lexicographic order.
    pub fn from_names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let unique: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        Self {
            names: unique.into_iter().collect(),
        }
    }

    /// Returns the zero-based id for `name`.
    pub fn id(&self, name: &str) -> Option<usize> {
        self.names
            .binary_search_by(|probe| probe.as_str().cmp(name))
            .ok()
    }

    /// Class names in id order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Renders the manifest: one `item { ... }` block per class, separated by
    /// a blank line.
    pub fn to_pbtxt_string(&self) -> String {
        self.names
            .iter()
            .enumerate()
            .map(|(id, name)| {
                format!(
                    "item {{\n  id: {}\n  name:'{}'\n}}\n",
                    id + 1,
                    escape_pbtxt(name)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Reads every annotation file and builds the label map from the classes seen.
pub fn build_label_map<P: AsRef<Path>>(files: &[P]) -> Result<LabelMap, LabelRecordsError> {
    let mut names = BTreeSet::new();
    for file in files {
        let annotation = read_rects_txt(file.as_ref())?;
        names.extend(annotation.classes);
    }

    let labels = LabelMap::from_names(names);
    info!("Generated labels: {:?}", labels.names());
    Ok(labels)
}

/// Writes the label map manifest into `folder` and returns its path.
pub fn write_label_map(folder: &Path, labels: &LabelMap) -> Result<PathBuf, LabelRecordsError> {
    let path = folder.join(LABEL_MAP_FILE_NAME);
    fs::write(&path, labels.to_pbtxt_string())?;
    info!("Wrote {} label(s) to {}", labels.len(), path.display());
    Ok(path)
}

fn escape_pbtxt(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch == '\\' || ch == '\'' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
