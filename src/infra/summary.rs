// ============================================================
// Layer 6 — Fold Balance Summary
// ============================================================
// Human-readable report of how each tracked value ended up
// distributed over the folds, one line per fold:
//
//   Crossfold 1: A - 10 B - 10  Sites: [S1, S3]
//   Crossfold 2: A - 10 B - 10  Sites: [S2, S4]
//
// Fold numbers follow the output label convention (1-based by
// default). This text is diagnostic output, not machine-parsed;
// the run manifest carries the same data as JSON.
//
// Reference: Rust Book §10 (Display trait)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Balance of one fold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldBalance {
    /// Output label of the fold
    pub label: String,

    /// (value, count) for every tracked value, in tracked order
    pub counts: Vec<(String, u64)>,

    /// Sites assigned to the fold, in site order
    pub sites: Vec<String>,
}

impl fmt::Display for FoldBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Crossfold {}: ", self.label)?;
        for (value, count) in &self.counts {
            write!(f, "{value} - {count} ")?;
        }
        write!(f, " Sites: [{}]", self.sites.join(", "))
    }
}

/// Per-fold balance for a whole run, in fold order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSummary {
    pub folds:     Vec<FoldBalance>,
    pub objective: i64,
}

impl FoldSummary {
    /// Largest minus smallest fold count of each tracked value.
    pub fn spread(&self) -> Vec<(String, u64)> {
        let Some(first) = self.folds.first() else {
            return Vec::new();
        };
        (0..first.counts.len())
            .map(|v| {
                let per_fold = self.folds.iter().map(|f| f.counts[v].1);
                let hi = per_fold.clone().max().unwrap_or(0);
                let lo = per_fold.min().unwrap_or(0);
                (first.counts[v].0.clone(), hi - lo)
            })
            .collect()
    }
}

impl fmt::Display for FoldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fold in &self.folds {
            writeln!(f, "{fold}")?;
        }
        write!(f, "Objective: {}", self.objective)
    }
}
