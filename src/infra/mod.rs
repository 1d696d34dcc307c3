// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Output side of a run:
//
//   writer.rs   — broadcasts each site's fold onto its rows and
//                 persists the augmented table
//
//   summary.rs  — per-fold balance report printed after a run
//
//   manifest.rs — optional JSON record of config, solver status
//                 and assignment
//
// Reference: Rust Book §7 (Modules)

/// Fold column broadcast and table persistence
pub mod writer;

/// Per-fold balance summary
pub mod summary;

/// JSON run manifest
pub mod manifest;
