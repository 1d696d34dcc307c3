// ============================================================
// Layer 4 — Feature Binner
// ============================================================
// Converts a continuous feature into integer bin labels so it
// can be used as a stratification category.
//
// Two strategies:
//   Quantile   — edges at the k/n quantiles (linear
//                interpolation between order statistics), so
//                each bin holds roughly the same number of rows
//   EqualWidth — n equal intervals between min and max
//
// Bins are right-closed, (e_i, e_i+1], with the lowest edge
// itself falling into bin 0. Labels are 0-based.
//
// Example with 4 quantile bins over 1..=8:
//   edges  = [1, 2.75, 4.5, 6.25, 8]
//   labels = 0 0 1 1 2 2 3 3
//
// Reference: Rust Book §8 (Vectors), §13 (Iterators)

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::errors::FoldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BinStrategy {
    Quantile,
    EqualWidth,
}

pub struct FeatureBinner {
    strategy: BinStrategy,
    n_bins:   usize,
}

impl FeatureBinner {
    pub fn new(strategy: BinStrategy, n_bins: usize) -> Result<Self, FoldError> {
        if n_bins == 0 {
            return Err(FoldError::invalid("number of bins must be at least 1"));
        }
        Ok(Self { strategy, n_bins })
    }

    /// Bin every present value; missing values stay `None`.
    pub fn bin(&self, values: &[Option<f64>]) -> Result<Vec<Option<usize>>, FoldError> {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        if present.is_empty() {
            return Err(FoldError::invalid("feature has no numeric values to bin"));
        }

        let edges = match self.strategy {
            BinStrategy::Quantile   => quantile_edges(&present, self.n_bins)?,
            BinStrategy::EqualWidth => equal_width_edges(&present, self.n_bins),
        };

        Ok(values.iter().map(|v| v.map(|x| bin_of(x, &edges))).collect())
    }
}

/// Parse one cell. Empty, `NA` and `NaN` are missing.
pub fn parse_cell(cell: &str) -> Result<Option<f64>, FoldError> {
    let t = cell.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("na") || t.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    match t.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(FoldError::invalid(format!("'{cell}' is not a number"))),
    }
}

/// n+1 strictly increasing quantile edges.
pub fn quantile_edges(values: &[f64], n_bins: usize) -> Result<Vec<f64>, FoldError> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let last  = (sorted.len() - 1) as f64;
    let edges: Vec<f64> = (0..=n_bins)
        .map(|k| {
            let pos  = last * k as f64 / n_bins as f64;
            let lo   = pos.floor() as usize;
            let hi   = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        })
        .collect();

    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(FoldError::invalid(format!(
            "quantile bin edges are not unique with {n_bins} bins; use fewer bins"
        )));
    }
    Ok(edges)
}

/// n+1 evenly spaced edges over [min, max]; a constant feature is
/// widened by 0.1% on each side first.
pub fn equal_width_edges(values: &[f64], n_bins: usize) -> Vec<f64> {
    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if lo == hi {
        let pad = if lo == 0.0 { 0.001 } else { lo.abs() * 0.001 };
        lo -= pad;
        hi += pad;
    }

    let step = (hi - lo) / n_bins as f64;
    (0..=n_bins)
        .map(|k| if k == n_bins { hi } else { lo + step * k as f64 })
        .collect()
}

/// Right-closed bin index of `x`, clamped into range.
fn bin_of(x: f64, edges: &[f64]) -> usize {
    let n_bins = edges.len() - 1;
    edges
        .partition_point(|e| *e < x)
        .saturating_sub(1)
        .min(n_bins - 1)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn some(v: &[f64]) -> Vec<Option<f64>> {
        v.iter().map(|x| Some(*x)).collect()
    }

    #[test]
    fn test_quantile_edges_interpolate() {
        let values: Vec<f64> = (1..=8).map(f64::from).collect();
        let edges = quantile_edges(&values, 4).unwrap();
        assert_eq!(edges, vec![1.0, 2.75, 4.5, 6.25, 8.0]);
    }

    #[test]
    fn test_quantile_bins_are_balanced() {
        let binner = FeatureBinner::new(BinStrategy::Quantile, 4).unwrap();
        let values: Vec<f64> = (1..=8).map(f64::from).collect();
        let labels = binner.bin(&some(&values)).unwrap();
        assert_eq!(
            labels,
            vec![Some(0), Some(0), Some(1), Some(1), Some(2), Some(2), Some(3), Some(3)]
        );
    }

    #[test]
    fn test_right_closed_edges() {
        // 4.5 sits exactly on an edge and belongs to the lower bin
        let edges = vec![1.0, 2.75, 4.5, 6.25, 8.0];
        assert_eq!(bin_of(4.5, &edges), 1);
        assert_eq!(bin_of(1.0, &edges), 0);
        assert_eq!(bin_of(8.0, &edges), 3);
    }

    #[test]
    fn test_duplicate_quantile_edges_fail() {
        let values = vec![1.0, 1.0, 1.0, 1.0, 2.0];
        assert!(matches!(quantile_edges(&values, 4), Err(FoldError::InvalidInput(_))));
    }

    #[test]
    fn test_equal_width_bins() {
        let binner = FeatureBinner::new(BinStrategy::EqualWidth, 2).unwrap();
        let labels = binner.bin(&some(&[0.0, 4.0, 5.0, 6.0, 10.0])).unwrap();
        assert_eq!(labels, vec![Some(0), Some(0), Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn test_constant_feature_lands_in_middle_bin() {
        let binner = FeatureBinner::new(BinStrategy::EqualWidth, 3).unwrap();
        let labels = binner.bin(&some(&[5.0, 5.0])).unwrap();
        assert_eq!(labels, vec![Some(1), Some(1)]);
    }

    #[test]
    fn test_missing_values_pass_through() {
        let binner = FeatureBinner::new(BinStrategy::Quantile, 2).unwrap();
        let labels = binner.bin(&[Some(1.0), None, Some(3.0)]).unwrap();
        assert_eq!(labels, vec![Some(0), None, Some(1)]);
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell(" 2.5 ").unwrap(), Some(2.5));
        assert_eq!(parse_cell("").unwrap(), None);
        assert_eq!(parse_cell("NaN").unwrap(), None);
        assert_eq!(parse_cell("NA").unwrap(), None);
        assert!(parse_cell("high").is_err());
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(FeatureBinner::new(BinStrategy::Quantile, 0).is_err());
    }
}
