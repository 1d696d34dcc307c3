// ============================================================
// Layer 3 — FoldAssignment
// ============================================================
// The one artifact carried from the solver to the writer:
// every site mapped to exactly one fold in [0, n_folds).
//
// Site order is the aggregator's order (first appearance in
// the input) and never changes after construction.
//
// Reference: Rust Book §8 (Collections)

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::errors::FoldError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldAssignment {
    n_folds: usize,
    folds:   IndexMap<String, usize>,
}

impl FoldAssignment {
    /// Build an assignment from parallel site / fold vectors.
    ///
    /// Rejects duplicate sites and out-of-range folds so that a
    /// constructed value always satisfies the partition invariant.
    pub fn new(n_folds: usize, sites: &[String], folds: &[usize]) -> Result<Self, FoldError> {
        if sites.len() != folds.len() {
            return Err(FoldError::invalid(format!(
                "{} sites but {} fold indices",
                sites.len(),
                folds.len()
            )));
        }

        let mut map = IndexMap::with_capacity(sites.len());
        for (site, &fold) in sites.iter().zip(folds) {
            if fold >= n_folds {
                return Err(FoldError::invalid(format!(
                    "site '{site}' assigned to fold {fold}, only {n_folds} folds exist"
                )));
            }
            if map.insert(site.clone(), fold).is_some() {
                return Err(FoldError::invalid(format!("site '{site}' assigned twice")));
            }
        }

        Ok(Self { n_folds, folds: map })
    }

    pub fn n_folds(&self) -> usize { self.n_folds }

    pub fn site_count(&self) -> usize { self.folds.len() }

    /// Fold of a site, `None` for unknown sites.
    pub fn fold_of(&self, site: &str) -> Option<usize> {
        self.folds.get(site).copied()
    }

    /// Sites in a fold, in site order.
    pub fn sites_in(&self, fold: usize) -> Vec<&str> {
        self.folds
            .iter()
            .filter(|(_, &f)| f == fold)
            .map(|(s, _)| s.as_str())
            .collect()
    }

    /// Folds that received no site.
    pub fn empty_folds(&self) -> Vec<usize> {
        (0..self.n_folds)
            .filter(|f| !self.folds.values().any(|v| v == f))
            .collect()
    }
}
