// ============================================================
// UNIT SUMMARY
// ============================================================
// One report row per known organizational unit

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Correction;

/// Submission status of one unit within a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSummary {
    pub unit_code: String,
    pub has_submission: bool,
    pub is_complete: bool,
    /// Bounded error text; empty when clean or not submitted
    pub error_summary: String,
    pub total_rows: usize,
    pub valid_rows: usize,
    /// File the figures come from
    pub file_name: Option<String>,
}

impl UnitSummary {
    /// Default state of a unit before any file is folded in
    pub fn no_submission(unit_code: impl Into<String>) -> Self {
        Self {
            unit_code: unit_code.into(),
            has_submission: false,
            is_complete: false,
            error_summary: String::new(),
            total_rows: 0,
            valid_rows: 0,
            file_name: None,
        }
    }
}

/// Why a file did not update any unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// No candidate encoding could read the file
    Unreadable(String),
    /// No unit code could be extracted from the file name
    MissingUnitCode,
    /// The extracted code is not a known unit
    UnknownUnit(String),
    /// Another file already reported for this unit
    DuplicateUnit(String),
    /// Unexpected failure while processing the file
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unreadable(reason) => write!(f, "unreadable file: {}", reason),
            SkipReason::MissingUnitCode => write!(f, "no unit code found in the file name"),
            SkipReason::UnknownUnit(code) => write!(f, "unit '{}' is not a known unit", code),
            SkipReason::DuplicateUnit(code) => {
                write!(
                    f,
                    "unit '{}' already has a submission in this batch; the first file is kept",
                    code
                )
            }
            SkipReason::Failed(reason) => write!(f, "processing failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: SkipReason,
}

/// A correction together with the file it was found in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCorrection {
    pub file_name: String,
    pub correction: Correction,
}

impl fmt::Display for FileCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file_name, self.correction)
    }
}

/// Aggregated audit of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: String,
    /// Exactly one entry per known unit, in configured order
    pub units: Vec<UnitSummary>,
    pub skipped: Vec<SkippedFile>,
    pub corrections: Vec<FileCorrection>,
    /// (file name, advisory) pairs, e.g. non-canonical encodings
    pub warnings: Vec<(String, String)>,
}

impl CategoryReport {
    pub fn submitted_units(&self) -> usize {
        self.units.iter().filter(|u| u.has_submission).count()
    }

    pub fn complete_units(&self) -> usize {
        self.units.iter().filter(|u| u.is_complete).count()
    }

    pub fn total_rows(&self) -> usize {
        self.units.iter().map(|u| u.total_rows).sum()
    }

    pub fn valid_rows(&self) -> usize {
        self.units.iter().map(|u| u.valid_rows).sum()
    }

    pub fn unit(&self, code: &str) -> Option<&UnitSummary> {
        self.units.iter().find(|u| u.unit_code == code)
    }
}
