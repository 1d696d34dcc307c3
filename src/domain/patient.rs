// ============================================================
// Layer 3 — Patient Domain Types
// ============================================================
// A PatientRecord is one input row reduced to the three fields
// the optimizer cares about: who, which category, which site.
//
// Category values arrive as text. Two values are the same when
//   - both parse as finite numbers with equal value
//     ("1", "1.0" and " 1 " all match), or
//   - otherwise, their trimmed text is identical.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

/// One patient row as seen by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Unique patient identifier
    pub patient_id: String,

    /// Raw stratification category value from the input
    pub category: String,

    /// Site identifier, empty when it could not be determined
    pub site: String,
}

impl PatientRecord {
    pub fn new(
        patient_id: impl Into<String>,
        category:   impl Into<String>,
        site:       impl Into<String>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            category:   category.into(),
            site:       site.into(),
        }
    }

    /// Comparison key of this record's category value.
    pub fn category_key(&self) -> String {
        category_key(&self.category)
    }
}

/// Normalise a category value into its comparison key.
///
/// Numeric text collapses to the shortest float rendering so that
/// `"2"`, `"2.0"` and `"2.00"` share the key `"2"`. NaN and infinities
/// are left as text.
pub fn category_key(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => {
            // -0 and 0 must agree
            let v = if v == 0.0 { 0.0 } else { v };
            format!("{v}")
        }
        _ => trimmed.to_string(),
    }
}
