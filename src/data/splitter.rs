// ============================================================
// Layer 4 — Fold Index Splitter
// ============================================================
// Turns a fold column into one (train, test) index pair per
// fold, the format training loops consume for k-fold CV:
//
//   labels: ["1", "2", "1", "3"]
//   fold 1 → train [1, 3]     test [0, 2]
//   fold 2 → train [0, 2, 3]  test [1]
//   fold 3 → train [0, 1, 2]  test [3]
//
// Folds are ordered numerically when every label is an integer,
// otherwise lexicographically. Rows with an empty label are
// never a test row, so they appear in every train set.
//
// Reference: Rust Book §8 (Vectors), §13 (Iterators)

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Row indices for one cross-validation fold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSplit {
    pub fold:  String,
    pub train: Vec<usize>,
    pub test:  Vec<usize>,
}

pub fn split_by_fold<S: AsRef<str>>(labels: &[S]) -> Vec<FoldSplit> {
    let labels: Vec<&str> = labels.iter().map(|l| l.as_ref().trim()).collect();

    let distinct: BTreeSet<&str> = labels.iter().copied().filter(|l| !l.is_empty()).collect();
    let mut folds: Vec<&str> = distinct.into_iter().collect();

    let numeric: Option<Vec<i64>> = folds.iter().map(|f| f.parse().ok()).collect();
    if let Some(keys) = numeric {
        let mut paired: Vec<(i64, &str)> = keys.into_iter().zip(folds).collect();
        paired.sort();
        folds = paired.into_iter().map(|(_, f)| f).collect();
    }

    let unlabelled = labels.iter().filter(|l| l.is_empty()).count();
    if unlabelled > 0 {
        tracing::warn!("{} rows have no fold label and join every train set", unlabelled);
    }

    folds
        .into_iter()
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..labels.len()).partition(|&i| labels[i] == fold);
            tracing::debug!("Fold {}: {} train, {} test", fold, train.len(), test.len());
            FoldSplit { fold: fold.to_string(), train, test }
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_split_per_fold() {
        let splits = split_by_fold(&["1", "2", "1", "3"]);
        assert_eq!(splits.len(), 3);
        assert_eq!(splits[0], FoldSplit { fold: "1".into(), train: vec![1, 3], test: vec![0, 2] });
        assert_eq!(splits[2].test, vec![3]);
    }

    #[test]
    fn test_train_and_test_cover_all_rows() {
        let labels = ["2", "1", "2", "2", "1"];
        for s in split_by_fold(&labels) {
            let mut all: Vec<usize> = s.train.iter().chain(&s.test).copied().collect();
            all.sort();
            assert_eq!(all, (0..labels.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_numeric_labels_sort_by_value() {
        let splits = split_by_fold(&["10", "2", "1"]);
        let order: Vec<&str> = splits.iter().map(|s| s.fold.as_str()).collect();
        assert_eq!(order, vec!["1", "2", "10"]);
    }

    #[test]
    fn test_text_labels_sort_lexicographically() {
        let splits = split_by_fold(&["b", "a", "10"]);
        let order: Vec<&str> = splits.iter().map(|s| s.fold.as_str()).collect();
        assert_eq!(order, vec!["10", "a", "b"]);
    }

    #[test]
    fn test_unlabelled_rows_only_train() {
        let splits = split_by_fold(&["1", "", "2"]);
        assert_eq!(splits.len(), 2);
        for s in &splits {
            assert!(s.train.contains(&1));
            assert!(!s.test.contains(&1));
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(split_by_fold::<&str>(&[]).is_empty());
    }
}
