// ============================================================
// Layer 4 — Record Extraction
// ============================================================
// Turns table rows into PatientRecords. Row i of the table
// becomes record i, so later stages can map results back onto
// the table by position.
//
// The site comes from the configured SiteRule: either its own
// column or a rule applied to the patient identifier.

use crate::data::table::Table;
use crate::domain::{errors::FoldError, patient::PatientRecord, site_rule::SiteRule};

/// Columns the optimizer reads from the input table.
#[derive(Debug, Clone)]
pub struct RecordColumns<'a> {
    pub patient:  &'a str,
    pub category: &'a str,
    pub site:     &'a SiteRule,
}

pub fn extract_records(table: &Table, cols: &RecordColumns<'_>) -> Result<Vec<PatientRecord>, FoldError> {
    let patient_idx  = table.column_index(cols.patient)?;
    let category_idx = table.column_index(cols.category)?;
    let site_idx = match cols.site.column() {
        Some(name) => Some(table.column_index(name)?),
        None => None,
    };

    table
        .rows()
        .iter()
        .enumerate()
        .map(|(line, row)| -> Result<PatientRecord, FoldError> {
            let patient = row[patient_idx].trim();
            let site = match site_idx {
                Some(idx) => row[idx].trim().to_string(),
                None if patient.is_empty() => String::new(),
                None => cols.site.derive(patient).ok_or_else(|| {
                    FoldError::invalid(format!(
                        "row {}: cannot derive a site from patient id '{patient}' with rule '{}'",
                        line + 1,
                        cols.site
                    ))
                })?,
            };
            Ok(PatientRecord::new(patient, row[category_idx].as_str(), site))
        })
        .collect()
}
