// ============================================================
// Layer 5 — Solver Adapter
// ============================================================
// Hands a PartitionModel to any QuadraticSolver and turns the
// raw 0/1 vector back into a FoldAssignment.
//
//   PartitionModel ──► solver.solve(program, params)
//                  ──► decode g[f][s] ──► SolvedPartition
//
// Timeout policy: a feasible result that was not proven optimal
// before the time limit is accepted with a warning, unless
// `require_optimal` is set, in which case it is a SolverTimeout.
//
// Reference: Rust Book §10 (Generic Types and Traits)

use serde::Serialize;
use std::time::Duration;

use crate::domain::{
    assignment::FoldAssignment,
    errors::FoldError,
    program::{SolveParams, SolveStatus},
    traits::QuadraticSolver,
};
use crate::optim::model::PartitionModel;

/// Outcome of one solve, carried to the writer and the manifest.
#[derive(Debug, Clone, Serialize)]
pub struct SolvedPartition {
    pub assignment: FoldAssignment,
    pub objective:  i64,
    pub status:     SolveStatus,
    pub solver:     String,
    pub nodes:      u64,
}

pub struct SolverAdapter<S: QuadraticSolver> {
    solver:          S,
    time_limit:      Duration,
    seed:            u64,
    require_optimal: bool,
}

impl<S: QuadraticSolver> SolverAdapter<S> {
    pub fn new(solver: S, time_limit: Duration, seed: u64) -> Self {
        Self { solver, time_limit, seed, require_optimal: false }
    }

    /// Treat time-limited results as failures.
    pub fn require_optimal(mut self, yes: bool) -> Self {
        self.require_optimal = yes;
        self
    }

    pub fn solve(&self, model: &PartitionModel) -> Result<SolvedPartition, FoldError> {
        let params = SolveParams { time_limit: self.time_limit, seed: self.seed };

        tracing::info!(
            "Solving {} sites into {} folds with {} (time limit {}s, seed {})",
            model.sites().len(),
            model.n_folds(),
            self.solver.name(),
            self.time_limit.as_secs_f64(),
            self.seed
        );

        let solution = self.solver.solve(model.program(), &params)?;

        if !model.program().is_feasible(&solution.values) {
            return Err(FoldError::InfeasibleModel(format!(
                "{} returned an assignment that breaks the partition constraint",
                self.solver.name()
            )));
        }
        let assignment = model.decode(&solution.values)?;

        let objective = model.objective(&assignment);
        if objective != solution.objective {
            tracing::warn!(
                "{} reported objective {}, the assignment evaluates to {}",
                self.solver.name(),
                solution.objective,
                objective
            );
        }

        match solution.status {
            SolveStatus::Optimal => {
                tracing::info!("Optimal assignment found, objective {}", objective);
            }
            SolveStatus::TimeLimited if self.require_optimal => {
                return Err(FoldError::SolverTimeout { limit: self.time_limit });
            }
            SolveStatus::TimeLimited => {
                tracing::warn!(
                    "Time limit reached; using best assignment found (objective {}, not proven optimal)",
                    objective
                );
            }
        }

        tracing::debug!("{} sites placed after {} search nodes", assignment.site_count(), solution.nodes);
        let empty = assignment.empty_folds();
        if !empty.is_empty() {
            tracing::warn!("Folds {:?} received no sites", empty);
        }

        Ok(SolvedPartition {
            assignment,
            objective,
            status:    solution.status,
            solver:    self.solver.name().to_string(),
            nodes:     solution.nodes,
        })
    }
}
