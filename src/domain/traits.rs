// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The optimizer only ever talks to a solver through this trait,
// so any integer / quadratic engine can be substituted by
// implementing it:
//
//   - BranchAndBoundSolver → built-in exact search (Layer 5)
//   - (future) bindings to an external MIQP engine
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use crate::domain::errors::FoldError;
use crate::domain::program::{BinaryProgram, SolveParams, Solution};

// ─── QuadraticSolver ──────────────────────────────────────────────────────────
/// Any engine that can minimise a `BinaryProgram`.
///
/// Contract:
///   - a returned `Solution` is always feasible
///   - `Err(FoldError::InfeasibleModel)` when no feasible point exists
///   - `Err(FoldError::SolverTimeout)` when the time limit passes
///     before any feasible point was found
///   - equal inputs and equal `params.seed` give equal results
///     whenever the search finishes inside the time limit
pub trait QuadraticSolver {
    /// Short name for logs and the run manifest.
    fn name(&self) -> &str;

    fn solve(&self, program: &BinaryProgram, params: &SolveParams) -> Result<Solution, FoldError>;
}
