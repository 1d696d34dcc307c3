// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a CSV file and the count matrix, plus the
// two standalone table transforms:
//
//   input.csv
//       │
//       ▼
//   Table            → header + string cells, atomic writes
//       │
//       ▼
//   extract_records  → one PatientRecord per row
//       │
//       ▼
//   SiteAggregator   → counts[value][site] + totals
//
//   FeatureBinner    → continuous feature → bin labels
//   split_by_fold    → fold column → (train, test) indices
//
// Reference: Rust Book §13 (Iterators and Closures)

/// CSV table read / write
pub mod table;

/// Table rows → PatientRecords
pub mod records;

/// Site × category count matrix
pub mod aggregator;

/// Quantile and equal-width binning
pub mod binner;

/// Per-fold train/test index pairs
pub mod splitter;
