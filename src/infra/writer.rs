// ============================================================
// Layer 6 — Assignment Writer
// ============================================================
// Maps the solved site → fold assignment back onto every input
// row and stages the augmented table for writing.
//
//   row i ──► records[i].site ──► assignment.fold_of(site)
//         ──► label (fold + 1 by default) ──► fold column
//
// Rows whose site is empty were never assigned and get an empty
// label. Any other site missing from the assignment is a bug
// upstream and aborts the write.
//
// Reference: Rust Book §8 (Vectors), §9 (Error Handling)

use std::path::Path;

use crate::data::{
    aggregator::SiteCounts,
    table::{StagedFile, Table},
};
use crate::domain::{assignment::FoldAssignment, errors::FoldError, patient::PatientRecord};
use crate::infra::summary::{FoldBalance, FoldSummary};

/// How fold indices are rendered in the output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldLabels {
    /// 1..=n_folds
    OneBased,
    /// 0..n_folds
    ZeroBased,
}

impl FoldLabels {
    pub fn label(self, fold: usize) -> String {
        match self {
            FoldLabels::OneBased  => (fold + 1).to_string(),
            FoldLabels::ZeroBased => fold.to_string(),
        }
    }
}

pub struct AssignmentWriter<'a> {
    assignment: &'a FoldAssignment,
    labels:     FoldLabels,
}

impl<'a> AssignmentWriter<'a> {
    pub fn new(assignment: &'a FoldAssignment, labels: FoldLabels) -> Self {
        Self { assignment, labels }
    }

    /// Fold label of every record, in record order.
    pub fn fold_column(&self, records: &[PatientRecord]) -> Result<Vec<String>, FoldError> {
        records
            .iter()
            .map(|r| {
                if r.site.is_empty() {
                    return Ok(String::new());
                }
                self.assignment
                    .fold_of(&r.site)
                    .map(|f| self.labels.label(f))
                    .ok_or_else(|| {
                        FoldError::invalid(format!(
                            "site '{}' of patient '{}' has no fold",
                            r.site, r.patient_id
                        ))
                    })
            })
            .collect()
    }

    /// Add the fold column to `table` (one record per row).
    pub fn augment(&self, table: &mut Table, records: &[PatientRecord], column: &str) -> Result<(), FoldError> {
        if table.len() != records.len() {
            return Err(FoldError::invalid(format!(
                "{} records for a table of {} rows",
                records.len(),
                table.len()
            )));
        }
        let folds = self.fold_column(records)?;
        table.set_column(column, folds)
    }

    /// Augment the table and stage it for `path`. Nothing appears at
    /// `path` until the returned file is committed.
    pub fn stage(
        &self,
        mut table: Table,
        records: &[PatientRecord],
        column:  &str,
        path:    &Path,
    ) -> Result<StagedFile, FoldError> {
        self.augment(&mut table, records, column)?;
        let staged = table.stage_csv(path)?;
        tracing::debug!("Staged {} rows with column '{}' for '{}'", table.len(), column, path.display());
        Ok(staged)
    }

    /// Per-fold counts and site lists, in fold order.
    pub fn summary(&self, counts: &SiteCounts, objective: i64) -> FoldSummary {
        let folds = (0..self.assignment.n_folds())
            .map(|f| {
                let sites: Vec<String> =
                    self.assignment.sites_in(f).into_iter().map(str::to_string).collect();

                let per_value = counts
                    .values
                    .iter()
                    .zip(&counts.counts)
                    .map(|(value, row)| {
                        let n = counts
                            .sites
                            .iter()
                            .zip(row)
                            .filter(|(site, _)| self.assignment.fold_of(site) == Some(f))
                            .map(|(_, c)| c)
                            .sum::<u64>();
                        (value.clone(), n)
                    })
                    .collect();

                FoldBalance { label: self.labels.label(f), counts: per_value, sites }
            })
            .collect();

        FoldSummary { folds, objective }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn assignment() -> FoldAssignment {
        let sites: Vec<String> = ["S1", "S2", "S3"].iter().map(|s| s.to_string()).collect();
        FoldAssignment::new(2, &sites, &[0, 1, 0]).unwrap()
    }

    fn records() -> Vec<PatientRecord> {
        vec![
            PatientRecord::new("p1", "A", "S1"),
            PatientRecord::new("p2", "B", "S2"),
            PatientRecord::new("p3", "A", "S3"),
            PatientRecord::new("p4", "B", ""),
            PatientRecord::new("p5", "A", "S2"),
        ]
    }

    #[test]
    fn test_fold_column_follows_site() {
        let a   = assignment();
        let col = AssignmentWriter::new(&a, FoldLabels::OneBased).fold_column(&records()).unwrap();
        assert_eq!(col, vec!["1", "2", "1", "", "2"]);

        let col = AssignmentWriter::new(&a, FoldLabels::ZeroBased).fold_column(&records()).unwrap();
        assert_eq!(col, vec!["0", "1", "0", "", "1"]);
    }

    #[test]
    fn test_unknown_site_is_an_error() {
        let a   = assignment();
        let err = AssignmentWriter::new(&a, FoldLabels::OneBased)
            .fold_column(&[PatientRecord::new("p9", "A", "S9")])
            .unwrap_err();
        assert!(err.to_string().contains("S9"));
    }

    #[test]
    fn test_staged_table_broadcasts_folds() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("folds.csv");
        let table = Table::from_reader(
            "patient,feature,site\np1,A,S1\np2,B,S2\np3,A,S3\np4,B,\np5,A,S2\n".as_bytes(),
        )
        .unwrap();

        let a = assignment();
        AssignmentWriter::new(&a, FoldLabels::OneBased)
            .stage(table, &records(), "CV3", &path)
            .unwrap()
            .commit()
            .unwrap();

        // join the output back on site: every row carries its site's fold
        let out   = Table::read_csv(&path).unwrap();
        let sites = out.column("site").unwrap();
        let folds = out.column("CV3").unwrap();
        for (site, fold) in sites.iter().zip(&folds) {
            match a.fold_of(site) {
                Some(f) => assert_eq!(*fold, (f + 1).to_string()),
                None    => assert!(fold.is_empty()),
            }
        }
    }

    #[test]
    fn test_row_count_mismatch_writes_nothing() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("folds.csv");
        let table = Table::from_reader("patient,site\np1,S1\n".as_bytes()).unwrap();

        let a = assignment();
        let result = AssignmentWriter::new(&a, FoldLabels::OneBased).stage(table, &records(), "CV3", &path);
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_summary_counts_per_fold() {
        let counts = SiteCounts {
            values: vec!["A".into(), "B".into()],
            sites:  vec!["S1".into(), "S2".into(), "S3".into()],
            counts: vec![vec![1, 1, 1], vec![0, 1, 0]],
            totals: vec![3, 1],
        };
        let a = assignment();
        let summary = AssignmentWriter::new(&a, FoldLabels::OneBased).summary(&counts, 7);

        assert_eq!(summary.folds.len(), 2);
        assert_eq!(summary.folds[0].counts, vec![("A".to_string(), 2), ("B".to_string(), 0)]);
        assert_eq!(summary.folds[0].sites, vec!["S1".to_string(), "S3".to_string()]);
        assert_eq!(summary.folds[1].label, "2");
        assert_eq!(summary.objective, 7);
    }
}
