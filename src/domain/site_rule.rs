// ============================================================
// Layer 3 — Site Rules
// ============================================================
// A site is either read from its own column or derived from the
// patient identifier. Derivation is an explicit, swappable rule:
//
//   column:<name>             → value of column <name>
//   split:<delim>:<index>     → field <index> of id split on <delim>
//   substring:<start>:<len>   → <len> characters from <start>
//
// TCGA barcodes such as "TCGA-A1-A0SB" carry the tissue source
// site in the second field, i.e. `split:-:1` → "A1".
//
// Reference: Rust Book §6 (Enums and Pattern Matching)
//            std::str::FromStr documentation

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::errors::FoldError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SiteRule {
    /// Read the site from a dedicated column
    Column { name: String },

    /// Split the patient id on `delimiter` and take field `index`
    Split { delimiter: String, index: usize },

    /// Take `len` characters of the patient id starting at `start`
    Substring { start: usize, len: usize },
}

impl Default for SiteRule {
    fn default() -> Self {
        SiteRule::Column { name: "site".to_string() }
    }
}

impl SiteRule {
    /// Column this rule reads from, if it reads one directly.
    pub fn column(&self) -> Option<&str> {
        match self {
            SiteRule::Column { name } => Some(name),
            _ => None,
        }
    }

    /// Derive a site from a patient identifier.
    ///
    /// Returns `None` for `Column` rules and when the identifier is too
    /// short for the rule.
    pub fn derive(&self, patient_id: &str) -> Option<String> {
        match self {
            SiteRule::Column { .. } => None,
            SiteRule::Split { delimiter, index } => patient_id
                .split(delimiter.as_str())
                .nth(*index)
                .map(str::to_string),
            SiteRule::Substring { start, len } => {
                let chars: Vec<char> = patient_id.chars().collect();
                if start + len > chars.len() {
                    return None;
                }
                Some(chars[*start..start + len].iter().collect())
            }
        }
    }
}

impl fmt::Display for SiteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteRule::Column { name }              => write!(f, "column:{name}"),
            SiteRule::Split { delimiter, index }   => write!(f, "split:{delimiter}:{index}"),
            SiteRule::Substring { start, len }     => write!(f, "substring:{start}:{len}"),
        }
    }
}

impl FromStr for SiteRule {
    type Err = FoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || {
            FoldError::invalid(format!(
                "site rule '{s}' must be column:<name>, split:<delim>:<index> \
                 or substring:<start>:<len>"
            ))
        };

        let (kind, rest) = s.split_once(':').ok_or_else(bad)?;
        match kind {
            "column" if !rest.is_empty() => Ok(SiteRule::Column { name: rest.to_string() }),
            "split" => {
                // the delimiter itself may contain ':', so split from the right
                let (delimiter, index) = rest.rsplit_once(':').ok_or_else(bad)?;
                if delimiter.is_empty() {
                    return Err(bad());
                }
                let index = index.parse().map_err(|_| bad())?;
                Ok(SiteRule::Split { delimiter: delimiter.to_string(), index })
            }
            "substring" => {
                let (start, len) = rest.split_once(':').ok_or_else(bad)?;
                let start = start.parse().map_err(|_| bad())?;
                let len: usize = len.parse().map_err(|_| bad())?;
                if len == 0 {
                    return Err(bad());
                }
                Ok(SiteRule::Substring { start, len })
            }
            _ => Err(bad()),
        }
    }
}
