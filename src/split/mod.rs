//! Train/eval split planning.

use std::path::PathBuf;

use log::info;
use rand::Rng;

use crate::discovery::discover_annotations;
use crate::error::LabelRecordsError;

/// Where the eval set comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalSource {
    /// Every discovered file is training data.
    None,
    /// Take the first `fraction` of the shuffled training files as eval.
    AutoSplit { fraction: f64 },
    /// Discover a second folder and use it as the eval set as-is.
    Folder(PathBuf),
}

/// The files that go into each split.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplitPlan {
    pub train: Vec<PathBuf>,
    pub eval: Vec<PathBuf>,
}

impl SplitPlan {
    /// Train files followed by eval files.
    pub fn all_files(&self) -> Vec<PathBuf> {
        self.train.iter().chain(&self.eval).cloned().collect()
    }
}

/// Check an eval source before any files are touched.
pub fn validate_eval_source(source: &EvalSource) -> Result<(), LabelRecordsError> {
    if let EvalSource::AutoSplit { fraction } = source {
        if !(0.0..=1.0).contains(fraction) {
            return Err(LabelRecordsError::InvalidOptions {
                message: format!("eval fraction must be in [0.0, 1.0], got {fraction}"),
            });
        }
    }
    Ok(())
}

/// Number of files an auto split moves to eval: `floor(total * fraction)`.
pub fn eval_count(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).floor() as usize).min(total)
}

/// Splits an already shuffled list: the first `floor(len * fraction)` files
/// become eval, the rest stay train.
pub fn split_off_eval(mut files: Vec<PathBuf>, fraction: f64) -> SplitPlan {
    let eval_size = eval_count(files.len(), fraction);
    info!("Generating eval split of {} element(s)", eval_size);
    let train = files.split_off(eval_size);
    SplitPlan { train, eval: files }
}

/// Builds the split plan from the shuffled training files.
///
/// `rng` is only used when the eval set comes from a separate folder, so
/// that folder is shuffled by the same seeded generator.
pub fn plan_split<R: Rng + ?Sized>(
    train_files: Vec<PathBuf>,
    source: &EvalSource,
    rng: &mut R,
) -> Result<SplitPlan, LabelRecordsError> {
    validate_eval_source(source)?;

    let plan = match source {
        EvalSource::None => {
            info!("Not generating an eval set");
            SplitPlan {
                train: train_files,
                eval: Vec::new(),
            }
        }
        EvalSource::AutoSplit { fraction } => {
            info!("Splitting train files to get eval");
            split_off_eval(train_files, *fraction)
        }
        EvalSource::Folder(folder) => {
            info!("Getting eval files from {}", folder.display());
            SplitPlan {
                train: train_files,
                eval: discover_annotations(folder, rng)?,
            }
        }
    };

    info!(
        "Split {} train file(s), {} eval file(s)",
        plan.train.len(),
        plan.eval.len()
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::fs;

    fn files(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("{i}.txt"))).collect()
    }

    #[test]
    fn auto_split_takes_floor_from_the_front() {
        let plan = split_off_eval(files(10), 0.15);
        assert_eq!(plan.eval, files(1));
        assert_eq!(plan.train.len(), 9);
        assert_eq!(plan.train[0], PathBuf::from("1.txt"));

        let plan = split_off_eval(files(10), 0.2);
        assert_eq!(plan.eval.len(), 2);
        assert_eq!(plan.train.len(), 8);
    }

    #[test]
    fn fraction_bounds_are_legal() {
        let none = split_off_eval(files(7), 0.0);
        assert!(none.eval.is_empty());
        assert_eq!(none.train.len(), 7);

        let all = split_off_eval(files(7), 1.0);
        assert!(all.train.is_empty());
        assert_eq!(all.eval.len(), 7);
    }

    #[test]
    fn no_eval_keeps_everything_in_train() {
        let mut rng = StdRng::seed_from_u64(42);
        let plan = plan_split(files(4), &EvalSource::None, &mut rng).unwrap();
        assert_eq!(plan.train, files(4));
        assert!(plan.eval.is_empty());
        assert_eq!(plan.all_files(), files(4));
    }

    #[test]
    fn rejects_out_of_range_fraction() {
        let mut rng = StdRng::seed_from_u64(42);
        for fraction in [-0.1, 1.5, f64::NAN] {
            let err = plan_split(files(4), &EvalSource::AutoSplit { fraction }, &mut rng)
                .unwrap_err();
            assert!(matches!(err, LabelRecordsError::InvalidOptions { .. }));
        }
    }

    #[test]
    fn external_folder_is_used_verbatim() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("e1.txt"), "").unwrap();
        fs::write(temp.path().join("e2.txt"), "").unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let source = EvalSource::Folder(temp.path().to_path_buf());
        let plan = plan_split(files(3), &source, &mut rng).unwrap();

        assert_eq!(plan.train, files(3));
        let mut eval = plan.eval.clone();
        eval.sort();
        assert_eq!(
            eval,
            vec![temp.path().join("e1.txt"), temp.path().join("e2.txt")]
        );
    }
}
