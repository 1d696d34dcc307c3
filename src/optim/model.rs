// ============================================================
// Layer 5 — Partition Model
// ============================================================
// Builds the balancing problem from the site × value counts.
//
// Decision variables (binary), index f · n_sites + s:
//   g[f][s] = 1  ⇔  site s is placed in fold f
//
// Hard constraint, one per site:
//   Σ_f g[f][s] = 1
//
// Objective, over every tracked value v and fold f jointly:
//   Σ_v Σ_f ( n_folds · Σ_s g[f][s] · count(v, s) − total(v) )²
//
// Each squared term is zero exactly when the fold holds its even
// share total(v) / n_folds; multiplying by n_folds keeps every
// coefficient an integer.
//
// Folds are interchangeable, which is declared to the solver as
// symmetric variable layers (layer f = all g[f][·]).
//
// Reference: Rust Book §8 (Vectors)

use crate::data::aggregator::SiteCounts;
use crate::domain::{
    assignment::FoldAssignment,
    errors::FoldError,
    program::BinaryProgram,
};

pub struct PartitionModel {
    n_folds: usize,
    counts:  SiteCounts,
    program: BinaryProgram,
}

impl PartitionModel {
    pub fn build(counts: &SiteCounts, n_folds: usize) -> Result<Self, FoldError> {
        let n_sites = counts.site_count();

        if n_folds == 0 {
            return Err(FoldError::invalid("number of folds must be at least 1"));
        }
        if n_sites == 0 {
            return Err(FoldError::invalid("cannot partition an empty site set"));
        }
        if n_folds > n_sites {
            return Err(FoldError::InfeasibleModel(format!(
                "{n_folds} folds requested but only {n_sites} distinct sites exist"
            )));
        }

        let var = |f: usize, s: usize| f * n_sites + s;
        let mut program = BinaryProgram::new(n_folds * n_sites);

        // ── Partition constraint ─────────────────────────────────────────────
        for s in 0..n_sites {
            program.add_equality((0..n_folds).map(|f| (var(f, s), 1)).collect(), 1);
        }

        // ── Balance objective ────────────────────────────────────────────────
        let k = n_folds as i64;
        for (row, &total) in counts.counts.iter().zip(&counts.totals) {
            for f in 0..n_folds {
                let terms = row
                    .iter()
                    .enumerate()
                    .filter(|(_, &c)| c > 0)
                    .map(|(s, &c)| (var(f, s), k * c as i64))
                    .collect();
                program.add_square(terms, -(total as i64));
            }
        }

        program.declare_symmetric_layers(
            (0..n_folds).map(|f| (0..n_sites).map(|s| var(f, s)).collect()).collect(),
        );

        tracing::debug!(
            "Partition model: {} variables, {} constraints, {} squared terms",
            program.num_vars(),
            program.equalities().len(),
            program.squares().len()
        );

        Ok(Self { n_folds, counts: counts.clone(), program })
    }

    pub fn n_folds(&self) -> usize { self.n_folds }

    pub fn sites(&self) -> &[String] { &self.counts.sites }

    pub fn program(&self) -> &BinaryProgram { &self.program }

    /// Variable index of g[fold][site].
    pub fn var(&self, fold: usize, site: usize) -> usize {
        fold * self.counts.site_count() + site
    }

    /// Read a site → fold assignment out of a 0/1 solution vector.
    ///
    /// Fails if any site is set in zero or several folds.
    pub fn decode(&self, values: &[bool]) -> Result<FoldAssignment, FoldError> {
        if values.len() != self.program.num_vars() {
            return Err(FoldError::InfeasibleModel(format!(
                "solution has {} values, model has {} variables",
                values.len(),
                self.program.num_vars()
            )));
        }

        let mut folds = Vec::with_capacity(self.sites().len());
        for (s, site) in self.sites().iter().enumerate() {
            let chosen: Vec<usize> = (0..self.n_folds).filter(|&f| values[self.var(f, s)]).collect();
            match chosen.as_slice() {
                [f] => folds.push(*f),
                _ => {
                    return Err(FoldError::InfeasibleModel(format!(
                        "solution places site '{site}' in {} folds",
                        chosen.len()
                    )))
                }
            }
        }

        FoldAssignment::new(self.n_folds, self.sites(), &folds)
    }

    /// fold_counts[f][v]: patients with value v in fold f.
    pub fn fold_counts(&self, assignment: &FoldAssignment) -> Vec<Vec<u64>> {
        let mut out = vec![vec![0u64; self.counts.value_count()]; self.n_folds];
        for (s, site) in self.sites().iter().enumerate() {
            if let Some(f) = assignment.fold_of(site) {
                for (v, row) in self.counts.counts.iter().enumerate() {
                    out[f][v] += row[s];
                }
            }
        }
        out
    }

    /// Objective value of an assignment.
    pub fn objective(&self, assignment: &FoldAssignment) -> i64 {
        let k = self.n_folds as i64;
        self.fold_counts(assignment)
            .iter()
            .flat_map(|per_value| {
                per_value
                    .iter()
                    .zip(&self.counts.totals)
                    .map(move |(&c, &t)| (k * c as i64 - t as i64).pow(2))
            })
            .sum()
    }
}
