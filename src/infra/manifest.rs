// ============================================================
// Layer 6 — Run Manifest
// ============================================================
// Optional JSON record of one crossfold run, written next to
// the output table when requested:
//
//   {
//     "config":     { ...CrossfoldConfig... },
//     "solver":     "branch-and-bound",
//     "status":     "optimal",
//     "objective":  0,
//     "nodes":      14,
//     "assignment": { "n_folds": 2, "folds": { "S1": 0, ... } },
//     "summary":    { "folds": [...], "objective": 0 }
//   }
//
// Folds in "assignment" are 0-based indices; "summary" uses the
// output labels.
//
// Reference: serde_json documentation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::crossfold_use_case::CrossfoldConfig;
use crate::data::table::StagedFile;
use crate::domain::{assignment::FoldAssignment, program::SolveStatus};
use crate::infra::summary::FoldSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub config:     CrossfoldConfig,
    pub solver:     String,
    pub status:     SolveStatus,
    pub objective:  i64,
    pub nodes:      u64,
    pub assignment: FoldAssignment,
    pub summary:    FoldSummary,
}

impl RunManifest {
    /// Encode the manifest as pretty JSON into a temp file beside `path`.
    pub fn stage(&self, path: &Path) -> Result<StagedFile> {
        let json = serde_json::to_string_pretty(self)?;
        let staged = StagedFile::write(path, json.as_bytes())
            .with_context(|| format!("Cannot write run manifest to '{}'", path.display()))?;
        tracing::debug!("Staged run manifest for '{}'", path.display());
        Ok(staged)
    }
}
