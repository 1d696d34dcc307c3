// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands and all their flags:
//
//   crossfolds     — site-preserved stratified fold assignment
//   bin-features   — continuous features → bin label tables
//   extract-folds  — fold column → (train, test) index pairs
//
// Each Args struct converts into its application-layer config
// with `From`, so the use cases never see clap types.
//
// Reference: Rust Book §12 (Building a CLI Program)
//            clap derive documentation

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    bin_use_case::BinConfig,
    crossfold_use_case::CrossfoldConfig,
    export_use_case::ExportConfig,
};
use crate::data::binner::BinStrategy;
use crate::domain::site_rule::SiteRule;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assign sites to cross-validation folds, balancing a category
    Crossfolds(CrossfoldArgs),

    /// Bin continuous features into discrete labels
    BinFeatures(BinArgs),

    /// Export (train, test) row indices for every fold
    ExtractFolds(ExtractArgs),
}

#[derive(Args, Debug)]
pub struct CrossfoldArgs {
    /// Input CSV with one row per patient (or slide)
    #[arg(long, default_value = "example.csv")]
    pub data_csv: PathBuf,

    /// Output CSV: the input plus the fold column
    #[arg(long, default_value = "crossfolds.csv")]
    pub output_csv: PathBuf,

    /// Column to stratify by
    #[arg(long, default_value = "feature")]
    pub category: String,

    /// Category values to balance, comma separated
    #[arg(long, value_delimiter = ',', default_value = "A,B")]
    pub values: Vec<String>,

    /// Number of folds
    #[arg(long, default_value_t = 3)]
    pub n_folds: usize,

    /// Name of the fold column added to the output
    #[arg(long, default_value = "CV3")]
    pub target_column: String,

    /// Column holding the unique patient identifier
    #[arg(long, default_value = "patient")]
    pub patient_column: String,

    /// Column holding the site of each patient
    #[arg(long, default_value = "site", conflicts_with = "site_rule")]
    pub site_column: String,

    /// Derive the site from the patient id instead,
    /// e.g. `split:-:1` or `substring:5:2`
    #[arg(long, value_parser = parse_site_rule)]
    pub site_rule: Option<SiteRule>,

    /// Solver time limit in seconds
    #[arg(long, alias = "timelimit", default_value_t = 100)]
    pub time_limit: u64,

    /// Seed for the solver's tie-breaking
    #[arg(long, alias = "randomseed", default_value_t = 0)]
    pub seed: u64,

    /// Fail instead of accepting a result not proven optimal in time
    #[arg(long)]
    pub require_optimal: bool,

    /// Label folds 0..n-1 instead of 1..n
    #[arg(long)]
    pub zero_based: bool,

    /// Also write a JSON manifest of the run here
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

impl From<CrossfoldArgs> for CrossfoldConfig {
    fn from(a: CrossfoldArgs) -> Self {
        CrossfoldConfig {
            input_csv:       a.data_csv,
            output_csv:      a.output_csv,
            category:        a.category,
            values:          a.values,
            n_folds:         a.n_folds,
            target_column:   a.target_column,
            patient_column:  a.patient_column,
            site:            a.site_rule.unwrap_or(SiteRule::Column { name: a.site_column }),
            time_limit_secs: a.time_limit,
            seed:            a.seed,
            require_optimal: a.require_optimal,
            zero_based:      a.zero_based,
            manifest:        a.manifest,
        }
    }
}

#[derive(Args, Debug)]
pub struct BinArgs {
    /// CSV with a patient column and continuous feature columns
    #[arg(long)]
    pub input_csv: PathBuf,

    /// Number of bins per feature
    #[arg(long, default_value_t = 5)]
    pub n_bins: usize,

    /// How bin edges are chosen
    #[arg(long, value_enum, default_value_t = BinStrategy::Quantile)]
    pub strategy: BinStrategy,

    /// Column holding the patient identifier
    #[arg(long, default_value = "PATIENT")]
    pub patient_col: String,

    /// Features to bin (default: every other column)
    #[arg(long, value_delimiter = ',')]
    pub features: Vec<String>,

    /// Add a SITE column derived from the patient id, e.g. `split:-:1`
    #[arg(long, value_parser = parse_site_rule)]
    pub site_rule: Option<SiteRule>,

    /// Directory for the per-feature output files
    #[arg(long, default_value = "./output")]
    pub output_dir: PathBuf,
}

impl From<BinArgs> for BinConfig {
    fn from(a: BinArgs) -> Self {
        BinConfig {
            input_csv:      a.input_csv,
            output_dir:     a.output_dir,
            patient_column: a.patient_col,
            features:       a.features,
            n_bins:         a.n_bins,
            strategy:       a.strategy,
            site_rule:      a.site_rule,
            ..BinConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// CSV written by `crossfolds`
    #[arg(long)]
    pub input_csv: PathBuf,

    /// Name of the fold column
    #[arg(long, default_value = "CV3")]
    pub cv_col: String,

    /// Directory that receives folds.json
    #[arg(long, default_value = "./")]
    pub output_path: PathBuf,
}

impl From<ExtractArgs> for ExportConfig {
    fn from(a: ExtractArgs) -> Self {
        ExportConfig {
            input_csv:   a.input_csv,
            cv_column:   a.cv_col,
            output_path: a.output_path,
        }
    }
}

fn parse_site_rule(s: &str) -> Result<SiteRule, String> {
    s.parse().map_err(|e: crate::domain::errors::FoldError| e.to_string())
}
