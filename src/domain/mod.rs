// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the fold
// assignment problem: patients, sites, category values,
// fold assignments, and the abstract solver capability.
//
// Rules for this layer:
//   - NO file I/O
//   - NO solver algorithm code
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Typed errors shared by every layer
pub mod errors;

// Patient rows and category value comparison
pub mod patient;

// How a site identifier is obtained for a patient
pub mod site_rule;

// Solved site → fold mapping
pub mod assignment;

// Solver-neutral binary quadratic program
pub mod program;

// Core abstractions (traits) that other layers implement
pub mod traits;
