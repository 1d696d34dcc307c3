// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Each use case wires the lower layers together for one
// command. No parsing, printing or solver math lives here.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Site-preserved, stratified fold assignment
pub mod crossfold_use_case;

// Continuous feature → bin label tables
pub mod bin_use_case;

// Fold column → (train, test) index pairs
pub mod export_use_case;
