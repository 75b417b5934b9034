//! Annotation file discovery.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use walkdir::WalkDir;

use crate::error::LabelRecordsError;

/// File name suffix of per-image annotation files.
pub const ANNOTATION_SUFFIX: &str = ".txt";

/// File name suffix of tracker initialization files, which share the
/// annotation suffix but do not describe a single image.
pub const SEED_SUFFIX: &str = "rects.txt";

/// Returns true if `file_name` names a per-image annotation file.
///
/// Matched on the raw name bytes, so names that are not valid UTF-8 still
/// count.
pub fn is_annotation_file_name(file_name: &OsStr) -> bool {
    let bytes = file_name.as_encoded_bytes();
    bytes.ends_with(ANNOTATION_SUFFIX.as_bytes()) && !bytes.ends_with(SEED_SUFFIX.as_bytes())
}

/// Recursively collects annotation files under `root` in a deterministic order.
///
/// Directory entries are visited sorted by file name, so the result does not
/// depend on the filesystem's enumeration order.
pub fn collect_annotation_files(root: &Path) -> Result<Vec<PathBuf>, LabelRecordsError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| LabelRecordsError::FolderUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        if is_annotation_file_name(entry.file_name()) {
            files.push(entry.path().to_path_buf());
        }
    }

    Ok(files)
}

/// Collects annotation files under `root` and shuffles them with `rng`.
///
/// The shuffle spreads any directory-order clustering across the list so a
/// fixed-fraction eval split takes a representative slice.
pub fn discover_annotations<R: Rng + ?Sized>(
    root: &Path,
    rng: &mut R,
) -> Result<Vec<PathBuf>, LabelRecordsError> {
    if !root.is_dir() {
        return Err(LabelRecordsError::InvalidOptions {
            message: format!("'{}' is not a readable directory", root.display()),
        });
    }

    let mut files = collect_annotation_files(root)?;
    files.shuffle(rng);
    info!(
        "Found {} annotation file(s) in {}",
        files.len(),
        root.display()
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, "").expect("write file");
    }

    #[test]
    fn suffix_filter_excludes_seed_files() {
        let matches = |name: &str| is_annotation_file_name(OsStr::new(name));
        assert!(matches("img_001.txt"));
        assert!(!matches("img_001.png"));
        assert!(!matches("rects.txt"));
        assert!(!matches("video_rects.txt"));
        assert!(!matches("label.pbtxt"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_are_collected() {
        use std::os::unix::ffi::OsStrExt;

        let temp = tempfile::tempdir().expect("create temp dir");
        let odd = temp.path().join(OsStr::from_bytes(b"caf\xe9.txt"));
        touch(&temp.path().join("good.txt"));
        touch(&odd);
        touch(&temp.path().join(OsStr::from_bytes(b"caf\xe9_rects.txt")));

        let files = collect_annotation_files(temp.path()).expect("collect");
        assert_eq!(files.len(), 2);
        assert!(files.contains(&odd));
    }

    #[test]
    fn collects_recursively_in_name_order() {
        let temp = tempfile::tempdir().expect("create temp dir");
        touch(&temp.path().join("b.txt"));
        touch(&temp.path().join("a.txt"));
        touch(&temp.path().join("a.png"));
        touch(&temp.path().join("nested/c.txt"));
        touch(&temp.path().join("nested/init_rects.txt"));

        let files = collect_annotation_files(temp.path()).expect("collect");
        let rel: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(temp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("b.txt"),
                PathBuf::from("nested/c.txt"),
            ]
        );
    }

    #[test]
    fn same_seed_gives_same_order() {
        let temp = tempfile::tempdir().expect("create temp dir");
        for i in 0..20 {
            touch(&temp.path().join(format!("img_{i:02}.txt")));
        }

        let first = discover_annotations(temp.path(), &mut StdRng::seed_from_u64(42)).unwrap();
        let second = discover_annotations(temp.path(), &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(sorted, collect_annotation_files(temp.path()).unwrap());
    }

    #[test]
    fn missing_root_is_a_configuration_error() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = discover_annotations(
            &temp.path().join("does-not-exist"),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
        assert!(matches!(err, LabelRecordsError::InvalidOptions { .. }));
    }
}
