// ============================================================
// Layer 3 — Error Types
// ============================================================
// Every failure the pipeline can report. All of them abort the
// run: nothing is retried and no partial output is written.
//
// Reference: Rust Book §9 (Recoverable Errors with Result)
//            thiserror crate documentation

use std::{io, path::PathBuf, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FoldError {
    /// Missing column, empty tracked-value list, empty site set,
    /// or any other input the pipeline cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// More folds than sites, or a program with no feasible point.
    #[error("infeasible model: {0}")]
    InfeasibleModel(String),

    /// The solver hit its time limit without an acceptable solution.
    #[error("solver found no acceptable solution within the {}s time limit", limit.as_secs_f64())]
    SolverTimeout { limit: Duration },

    /// The program uses structure the chosen solver cannot handle.
    #[error("solver cannot handle this program: {0}")]
    UnsupportedProgram(String),

    #[error("cannot access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed delimited file: {0}")]
    Csv(#[from] csv::Error),
}

impl FoldError {
    /// Build an `Io` variant tagged with the path that failed.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FoldError::Io { path: path.into(), source }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        FoldError::InvalidInput(msg.into())
    }
}
