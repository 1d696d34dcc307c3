// ============================================================
// Layer 5 — Optimization Layer
// ============================================================
// Everything between the count matrix and a FoldAssignment:
//
//   model.rs        — builds g[f][s], the partition constraint
//                     and the balance objective as a BinaryProgram
//
//   adapter.rs      — submits a model to any QuadraticSolver with
//                     a time limit and seed, decodes the result
//
//   branch_bound.rs — the built-in exact solver
//
// Reference: Rust Book §7 (Modules)

/// Partition model construction
pub mod model;

/// Solver invocation and result extraction
pub mod adapter;

/// Seeded, time-limited branch and bound
pub mod branch_bound;
