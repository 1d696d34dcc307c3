// ============================================================
// Layer 4 — Site Aggregator
// ============================================================
// Collapses patient records into a site × category count
// matrix, the only input the partition model needs.
//
//   records ──► distinct (patient, site, value) ──► counts[v][s]
//
// A patient with several rows (e.g. one per slide) is counted
// once per site and value. Values outside the tracked set are
// not counted. Sites are kept in first-appearance order.
//
// Reference: Rust Book §8 (HashMap), indexmap documentation

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use crate::domain::{
    errors::FoldError,
    patient::{category_key, PatientRecord},
};

/// Per-site category counts for the tracked values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteCounts {
    /// Tracked values as the caller spelled them
    pub values: Vec<String>,
    /// Site identifiers in first-appearance order
    pub sites: Vec<String>,
    /// counts[v][s]: distinct patients at site s with value v
    pub counts: Vec<Vec<u64>>,
    /// totals[v]: Σ_s counts[v][s]
    pub totals: Vec<u64>,
}

impl SiteCounts {
    pub fn site_count(&self) -> usize { self.sites.len() }

    pub fn value_count(&self) -> usize { self.values.len() }
}

pub struct SiteAggregator {
    values: Vec<String>,
    index:  HashMap<String, usize>,
}

impl SiteAggregator {
    /// Track the given category values.
    ///
    /// Fails when the list is empty or two entries normalise to the
    /// same comparison key (they would be counted twice).
    pub fn new(values: &[String]) -> Result<Self, FoldError> {
        if values.is_empty() {
            return Err(FoldError::invalid("no category values to stratify by"));
        }

        let mut index = HashMap::with_capacity(values.len());
        for (i, v) in values.iter().enumerate() {
            let key = category_key(v);
            if key.is_empty() {
                return Err(FoldError::invalid("tracked category values must not be empty"));
            }
            if let Some(prev) = index.insert(key, i) {
                return Err(FoldError::invalid(format!(
                    "tracked values '{}' and '{v}' are the same category",
                    values[prev]
                )));
            }
        }

        Ok(Self { values: values.to_vec(), index })
    }

    pub fn aggregate(&self, records: &[PatientRecord]) -> Result<SiteCounts, FoldError> {
        let mut sites: IndexMap<&str, Vec<u64>> = IndexMap::new();
        let mut seen: HashSet<(&str, &str, usize)> = HashSet::new();
        let mut no_site    = 0usize;
        let mut no_patient = 0usize;
        let mut untracked  = 0usize;

        for r in records {
            if r.site.is_empty() {
                no_site += 1;
                continue;
            }

            let counts = sites
                .entry(r.site.as_str())
                .or_insert_with(|| vec![0; self.values.len()]);

            if r.patient_id.is_empty() {
                no_patient += 1;
                continue;
            }

            match self.index.get(&r.category_key()) {
                Some(&v) => {
                    if seen.insert((r.patient_id.as_str(), r.site.as_str(), v)) {
                        counts[v] += 1;
                    }
                }
                None => untracked += 1,
            }
        }

        if no_site > 0 {
            tracing::warn!("{} rows have no site and are left out of the fold balance", no_site);
        }
        if no_patient > 0 {
            tracing::warn!("{} rows have no patient id and are not counted", no_patient);
        }
        if untracked > 0 {
            tracing::debug!("{} rows carry an untracked category value", untracked);
        }

        if sites.is_empty() {
            return Err(FoldError::invalid("input contains no sites"));
        }

        // transpose site → values into values → sites
        let n_values = self.values.len();
        let mut counts = vec![Vec::with_capacity(sites.len()); n_values];
        for per_site in sites.values() {
            for (v, c) in per_site.iter().enumerate() {
                counts[v].push(*c);
            }
        }
        let totals = counts.iter().map(|row| row.iter().sum()).collect();

        tracing::info!(
            "Aggregated {} records into {} sites x {} values",
            records.len(),
            sites.len(),
            n_values
        );

        Ok(SiteCounts {
            values: self.values.clone(),
            sites:  sites.keys().map(|s| s.to_string()).collect(),
            counts,
            totals,
        })
    }
}
