// ============================================================
// Layer 2 — BinFeaturesUseCase
// ============================================================
// Turns each continuous feature column into a discrete label
// that can later be used as a stratification category:
//
//   Step 1: Read the feature table         (Layer 4 - data)
//   Step 2: Pick the feature columns       (Layer 2)
//   Step 3: Bin every feature              (Layer 4 - data)
//   Step 4: Write one table per feature    (Layer 4 - data)
//
// Each output file <output_dir>/<feature>_binary_label.csv has
// the columns: patient, feature, <feature>_binary_label and,
// when a site rule is given, SITE. Rows are sorted by patient.
//
// All features are binned and every output is staged as a temp
// file before the first one is renamed into place, so a bad
// column or a failed write aborts the run without partial output.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::data::{
    binner::{parse_cell, BinStrategy, FeatureBinner},
    table::{commit_all, Table},
};
use crate::domain::{errors::FoldError, site_rule::SiteRule};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinConfig {
    pub input_csv:      PathBuf,
    pub output_dir:     PathBuf,
    pub patient_column: String,
    /// Columns to bin; empty means every non-patient column
    pub features:       Vec<String>,
    pub n_bins:         usize,
    pub strategy:       BinStrategy,
    pub label_suffix:   String,
    /// Adds a SITE column derived from the patient id
    pub site_rule:      Option<SiteRule>,
}

impl Default for BinConfig {
    fn default() -> Self {
        Self {
            input_csv:      PathBuf::from("features.csv"),
            output_dir:     PathBuf::from("./output"),
            patient_column: "PATIENT".to_string(),
            features:       Vec::new(),
            n_bins:         5,
            strategy:       BinStrategy::Quantile,
            label_suffix:   "_binary_label".to_string(),
            site_rule:      None,
        }
    }
}

pub struct BinFeaturesUseCase {
    config: BinConfig,
}

impl BinFeaturesUseCase {
    pub fn new(config: BinConfig) -> Self {
        Self { config }
    }

    /// Returns the paths written, in feature order.
    pub fn execute(&self) -> Result<Vec<PathBuf>> {
        let cfg = &self.config;

        if matches!(cfg.site_rule, Some(SiteRule::Column { .. })) {
            return Err(FoldError::invalid("the SITE column must be derived: use split: or substring:").into());
        }
        let binner = FeatureBinner::new(cfg.strategy, cfg.n_bins)?;

        // ── Step 1: Read ─────────────────────────────────────────────────────
        let table = Table::read_csv(&cfg.input_csv)
            .with_context(|| format!("Cannot load feature table '{}'", cfg.input_csv.display()))?;
        let patients = table.column(&cfg.patient_column)?;

        // ── Step 2: Feature columns ──────────────────────────────────────────
        let features: Vec<String> = if cfg.features.is_empty() {
            table
                .headers()
                .iter()
                .filter(|h| **h != cfg.patient_column)
                .cloned()
                .collect()
        } else {
            cfg.features.clone()
        };
        if features.is_empty() {
            return Err(FoldError::invalid("feature table has no columns besides the patient id").into());
        }

        let sites: Option<Vec<String>> = match &cfg.site_rule {
            Some(rule) => Some(
                patients
                    .iter()
                    .map(|p| {
                        rule.derive(p).ok_or_else(|| {
                            FoldError::invalid(format!("cannot derive a site from '{p}' with rule '{rule}'"))
                        })
                    })
                    .collect::<Result<_, _>>()?,
            ),
            None => None,
        };

        // ── Step 3: Bin ──────────────────────────────────────────────────────
        let mut outputs = Vec::with_capacity(features.len());
        for feature in &features {
            let raw = table.column(feature)?;
            let values = raw
                .iter()
                .map(|cell| parse_cell(cell))
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Feature '{feature}' has a non-numeric cell"))?;
            let bins = binner
                .bin(&values)
                .with_context(|| format!("Cannot bin feature '{feature}'"))?;

            let label_column = format!("{feature}{}", cfg.label_suffix);
            let mut headers = vec![cfg.patient_column.clone(), feature.clone(), label_column];
            if sites.is_some() {
                headers.push("SITE".to_string());
            }

            let mut out = Table::new(headers);
            for (i, bin) in bins.iter().enumerate() {
                let mut row = vec![
                    patients[i].to_string(),
                    raw[i].to_string(),
                    bin.map(|b| b.to_string()).unwrap_or_default(),
                ];
                if let Some(sites) = &sites {
                    row.push(sites[i].clone());
                }
                out.push_row(row)?;
            }
            out.sort_by_column(&cfg.patient_column)?;

            tracing::debug!("Binned '{}' into {} {:?} bins", feature, cfg.n_bins, cfg.strategy);
            outputs.push((cfg.output_dir.join(format!("{feature}{}.csv", cfg.label_suffix)), out));
        }

        // ── Step 4: Write ────────────────────────────────────────────────────
        fs::create_dir_all(&cfg.output_dir)
            .map_err(|e| FoldError::io(&cfg.output_dir, e))
            .context("Cannot create output directory")?;

        let staged = outputs
            .iter()
            .map(|(path, out)| out.stage_csv(path))
            .collect::<Result<Vec<_>, _>>()
            .context("Cannot write binned features")?;
        let written = commit_all(staged).context("Cannot move binned features into place")?;
        for path in &written {
            tracing::info!("Processed data saved to '{}'", path.display());
        }
        Ok(written)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const FEATURES: &str = "\
PATIENT,ESR1,AGE
TCGA-BH-0004,4.0,61
TCGA-A1-0001,1.0,45
TCGA-A1-0003,3.0,
TCGA-BH-0002,2.0,70
";

    fn config(dir: &std::path::Path) -> BinConfig {
        let input = dir.join("features.csv");
        fs::write(&input, FEATURES).unwrap();
        BinConfig {
            input_csv:  input,
            output_dir: dir.join("out"),
            n_bins:     2,
            ..BinConfig::default()
        }
    }

    #[test]
    fn test_one_file_per_feature() {
        let dir   = tempfile::tempdir().unwrap();
        let paths = BinFeaturesUseCase::new(config(dir.path())).execute().unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("ESR1_binary_label.csv"));
        assert!(paths[1].ends_with("AGE_binary_label.csv"));

        let esr1 = Table::read_csv(&paths[0]).unwrap();
        assert_eq!(esr1.headers(), &["PATIENT", "ESR1", "ESR1_binary_label"]);
        // sorted by patient id
        assert_eq!(esr1.column("PATIENT").unwrap()[0], "TCGA-A1-0001");
        assert_eq!(esr1.column("ESR1_binary_label").unwrap(), vec!["0", "1", "0", "1"]);

        let age = Table::read_csv(&paths[1]).unwrap();
        assert_eq!(age.column("AGE_binary_label").unwrap()[1], "");
    }

    #[test]
    fn test_optional_site_column() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BinConfig {
            features:  vec!["ESR1".to_string()],
            site_rule: Some("split:-:1".parse().unwrap()),
            strategy:  BinStrategy::EqualWidth,
            ..config(dir.path())
        };
        let paths = BinFeaturesUseCase::new(cfg).execute().unwrap();
        assert_eq!(paths.len(), 1);

        let out = Table::read_csv(&paths[0]).unwrap();
        assert_eq!(out.column("SITE").unwrap(), vec!["A1", "A1", "BH", "BH"]);
    }

    #[test]
    fn test_non_numeric_feature_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("features.csv");
        fs::write(&input, "PATIENT,ESR1,GRADE\np1,1.0,high\np2,2.0,low\n").unwrap();
        let cfg = BinConfig {
            input_csv:  input,
            output_dir: dir.path().join("out"),
            ..BinConfig::default()
        };

        let err = BinFeaturesUseCase::new(cfg.clone()).execute().unwrap_err();
        assert!(format!("{err:#}").contains("GRADE"));
        assert!(!cfg.output_dir.exists());
    }

    #[test]
    fn test_failed_write_leaves_no_feature_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        // a directory where the second output should go blocks its rename
        fs::create_dir_all(cfg.output_dir.join("AGE_binary_label.csv")).unwrap();

        assert!(BinFeaturesUseCase::new(cfg.clone()).execute().is_err());
        assert!(!cfg.output_dir.join("ESR1_binary_label.csv").exists());
        assert_eq!(fs::read_dir(&cfg.output_dir).unwrap().count(), 1);
    }

    #[test]
    fn test_unknown_feature_column() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BinConfig { features: vec!["PGR".to_string()], ..config(dir.path()) };
        assert!(BinFeaturesUseCase::new(cfg).execute().is_err());
    }
}
