// ============================================================
// Layer 2 — ExtractFoldsUseCase
// ============================================================
// Reads a table produced by the crossfold run and writes one
// (train, test) row-index pair per fold to <output_dir>/folds.json:
//
//   [
//     { "fold": "1", "train": [1, 3, ...], "test": [0, 2, ...] },
//     ...
//   ]
//
// Indices are 0-based positions of the data rows (header excluded).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    splitter::{split_by_fold, FoldSplit},
    table::{write_atomic, Table},
};
use crate::domain::errors::FoldError;

pub const FOLDS_FILE: &str = "folds.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub input_csv:   PathBuf,
    pub cv_column:   String,
    pub output_path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input_csv:   PathBuf::from("crossfolds.csv"),
            cv_column:   "CV3".to_string(),
            output_path: PathBuf::from("./"),
        }
    }
}

pub struct ExtractFoldsUseCase {
    config: ExportConfig,
}

impl ExtractFoldsUseCase {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Returns the splits and the file they were written to.
    pub fn execute(&self) -> Result<(Vec<FoldSplit>, PathBuf)> {
        let cfg = &self.config;

        let table = Table::read_csv(&cfg.input_csv)
            .with_context(|| format!("Cannot load fold table '{}'", cfg.input_csv.display()))?;
        let labels = table.column(&cfg.cv_column)?;
        if table.is_empty() {
            tracing::warn!("'{}' has no data rows", cfg.input_csv.display());
        }

        let splits = split_by_fold(&labels);
        if splits.is_empty() {
            return Err(FoldError::invalid(format!("column '{}' holds no fold labels", cfg.cv_column)).into());
        }

        let path = cfg.output_path.join(FOLDS_FILE);
        let json = serde_json::to_string(&splits)?;
        write_atomic(&path, json.as_bytes())
            .with_context(|| format!("Cannot write fold indices to '{}'", path.display()))?;

        tracing::info!("Wrote {} folds over {} rows to '{}'", splits.len(), table.len(), path.display());
        Ok((splits, path))
    }
}
