// ============================================================
// Layer 2 — CrossfoldUseCase
// ============================================================
// Orchestrates one fold assignment run:
//
//   Step 1: Validate configuration        (Layer 2)
//   Step 2: Read the input table          (Layer 4 - data)
//   Step 3: Extract patient records       (Layer 4 - data)
//   Step 4: Aggregate site counts         (Layer 4 - data)
//   Step 5: Build the partition model     (Layer 5 - optim)
//   Step 6: Solve                         (Layer 5 - optim)
//   Step 7: Summarise and write output    (Layer 6 - infra)
//
// Nothing is written until step 7. There the output table and
// the optional manifest are both staged as temp files and only
// then renamed into place, so a failed run leaves neither behind.
//
// Reference: Rust Book §13 (Iterators and Closures)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::data::{
    aggregator::SiteAggregator,
    records::{extract_records, RecordColumns},
    table::{commit_all, Table},
};
use crate::domain::{errors::FoldError, site_rule::SiteRule, traits::QuadraticSolver};
use crate::infra::{
    manifest::RunManifest,
    summary::FoldSummary,
    writer::{AssignmentWriter, FoldLabels},
};
use crate::optim::{
    adapter::{SolvedPartition, SolverAdapter},
    branch_bound::BranchAndBoundSolver,
    model::PartitionModel,
};

// ─── Crossfold Configuration ─────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossfoldConfig {
    pub input_csv:       PathBuf,
    pub output_csv:      PathBuf,
    pub category:        String,
    pub values:          Vec<String>,
    pub n_folds:         usize,
    pub target_column:   String,
    pub patient_column:  String,
    pub site:            SiteRule,
    pub time_limit_secs: u64,
    pub seed:            u64,
    pub require_optimal: bool,
    pub zero_based:      bool,
    pub manifest:        Option<PathBuf>,
}

impl Default for CrossfoldConfig {
    fn default() -> Self {
        Self {
            input_csv:       PathBuf::from("example.csv"),
            output_csv:      PathBuf::from("crossfolds.csv"),
            category:        "feature".to_string(),
            values:          vec!["A".to_string(), "B".to_string()],
            n_folds:         3,
            target_column:   "CV3".to_string(),
            patient_column:  "patient".to_string(),
            site:            SiteRule::default(),
            time_limit_secs: 100,
            seed:            0,
            require_optimal: false,
            zero_based:      false,
            manifest:        None,
        }
    }
}

impl CrossfoldConfig {
    /// Reject parameter combinations that can never produce a run.
    pub fn validate(&self) -> Result<(), FoldError> {
        if self.n_folds == 0 {
            return Err(FoldError::invalid("--n-folds must be at least 1"));
        }
        if self.values.is_empty() {
            return Err(FoldError::invalid("--values must name at least one category value"));
        }
        if self.time_limit_secs == 0 {
            return Err(FoldError::invalid("--time-limit must be at least 1 second"));
        }
        for (flag, name) in [
            ("--category", &self.category),
            ("--target-column", &self.target_column),
            ("--patient-column", &self.patient_column),
        ] {
            if name.trim().is_empty() {
                return Err(FoldError::invalid(format!("{flag} must not be empty")));
            }
        }
        if self.target_column == self.patient_column
            || self.target_column == self.category
            || Some(self.target_column.as_str()) == self.site.column()
        {
            return Err(FoldError::invalid(format!(
                "--target-column '{}' would overwrite an input column the optimizer reads",
                self.target_column
            )));
        }
        if self.input_csv == self.output_csv {
            return Err(FoldError::invalid("--output-csv must differ from --data-csv"));
        }
        Ok(())
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }

    pub fn labels(&self) -> FoldLabels {
        if self.zero_based { FoldLabels::ZeroBased } else { FoldLabels::OneBased }
    }
}

/// What a finished run hands back to the CLI.
#[derive(Debug, Clone)]
pub struct CrossfoldReport {
    pub solved:  SolvedPartition,
    pub summary: FoldSummary,
    pub rows:    usize,
}

// ─── CrossfoldUseCase ─────────────────────────────────────────────────────────
pub struct CrossfoldUseCase<S: QuadraticSolver = BranchAndBoundSolver> {
    config: CrossfoldConfig,
    solver: S,
}

impl CrossfoldUseCase<BranchAndBoundSolver> {
    /// Use case backed by the built-in solver.
    pub fn new(config: CrossfoldConfig) -> Self {
        Self::with_solver(config, BranchAndBoundSolver::new())
    }
}

impl<S: QuadraticSolver> CrossfoldUseCase<S> {
    pub fn with_solver(config: CrossfoldConfig, solver: S) -> Self {
        Self { config, solver }
    }

    pub fn execute(self) -> Result<CrossfoldReport> {
        let cfg = &self.config;

        // ── Step 1: Validate ─────────────────────────────────────────────────
        cfg.validate().context("Invalid crossfold configuration")?;

        // ── Step 2: Read input table ─────────────────────────────────────────
        tracing::info!("Reading patients from '{}'", cfg.input_csv.display());
        let table = Table::read_csv(&cfg.input_csv)
            .with_context(|| format!("Cannot load input table '{}'", cfg.input_csv.display()))?;

        // ── Step 3: Extract records ──────────────────────────────────────────
        let columns = RecordColumns {
            patient:  &cfg.patient_column,
            category: &cfg.category,
            site:     &cfg.site,
        };
        let records = extract_records(&table, &columns)
            .with_context(|| format!("Cannot read patients from '{}'", cfg.input_csv.display()))?;

        // ── Step 4: Aggregate per-site counts ────────────────────────────────
        let counts = SiteAggregator::new(&cfg.values)
            .and_then(|agg| agg.aggregate(&records))
            .with_context(|| format!("Cannot aggregate category '{}' by site", cfg.category))?;

        // ── Step 5: Build the partition model ────────────────────────────────
        let model = PartitionModel::build(&counts, cfg.n_folds)
            .with_context(|| format!("Cannot split sites into {} folds", cfg.n_folds))?;

        // ── Step 6: Solve ────────────────────────────────────────────────────
        let solved = SolverAdapter::new(self.solver, cfg.time_limit(), cfg.seed)
            .require_optimal(cfg.require_optimal)
            .solve(&model)
            .context("Fold assignment failed")?;

        // ── Step 7: Summarise and write output ───────────────────────────────
        let writer  = AssignmentWriter::new(&solved.assignment, cfg.labels());
        let summary = writer.summary(&counts, solved.objective);
        for fold in &summary.folds {
            tracing::info!("{}", fold);
        }
        tracing::debug!("Largest fold difference per value: {:?}", summary.spread());

        let rows = table.len();
        let mut staged = vec![writer
            .stage(table, &records, &cfg.target_column, &cfg.output_csv)
            .with_context(|| format!("Cannot write output table '{}'", cfg.output_csv.display()))?];

        if let Some(path) = &cfg.manifest {
            let manifest = RunManifest {
                config:     cfg.clone(),
                solver:     solved.solver.clone(),
                status:     solved.status,
                objective:  solved.objective,
                nodes:      solved.nodes,
                assignment: solved.assignment.clone(),
                summary:    summary.clone(),
            };
            staged.push(manifest.stage(path)?);
        }

        for path in commit_all(staged).context("Cannot move output files into place")? {
            tracing::info!("Wrote '{}'", path.display());
        }

        Ok(CrossfoldReport { solved, summary, rows })
    }
}
