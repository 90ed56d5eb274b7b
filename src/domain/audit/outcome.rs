// ============================================================
// AUDIT OUTCOMES
// ============================================================
// Per-field, per-row and per-file results of an audit

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one field check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidationOutcome {
    pub is_valid: bool,
    pub error_message: Option<String>,
    /// Canonical form of the value, when one could be computed
    pub corrected_value: Option<String>,
}

impl FieldValidationOutcome {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error_message: None,
            corrected_value: None,
        }
    }

    pub fn valid_as(corrected: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            error_message: None,
            corrected_value: Some(corrected.into()),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(message.into()),
            corrected_value: None,
        }
    }

    pub fn invalid_as(message: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(message.into()),
            corrected_value: Some(canonical.into()),
        }
    }
}

/// Validation result of one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowOutcome {
    /// Row index (0-based, header excluded)
    pub row_index: usize,
    pub is_valid: bool,
    /// Every failed check, in evaluation order
    pub errors: Vec<String>,
}

impl RowOutcome {
    pub fn new(row_index: usize, errors: Vec<String>) -> Self {
        Self {
            row_index,
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// 1-based line number in the source file (line 1 is the header)
    pub fn line_number(&self) -> usize {
        self.row_index + 2
    }
}

/// A value accepted only after mapping it onto a reference-list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub field: String,
    pub row_index: usize,
    pub original: String,
    pub corrected: String,
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} corrected in row {}: {} → {}",
            self.field,
            self.row_index + 2,
            self.original,
            self.corrected
        )
    }
}

/// Audit result of one readable file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAuditResult {
    pub file_name: String,
    pub category: String,
    /// Unit code detected from the file name
    pub unit_code: Option<String>,
    /// Encoding the file was finally read with
    pub encoding: String,
    pub is_canonical_encoding: bool,
    pub total_rows: usize,
    pub valid_rows: usize,
    /// Hard errors: structural problems plus the summarized row errors
    pub error_summary: Vec<String>,
    /// Advisories that never block completeness on their own
    pub warnings: Vec<String>,
    pub corrections: Vec<Correction>,
    /// Per-row results; empty when row validation never ran
    pub rows: Vec<RowOutcome>,
}

impl FileAuditResult {
    pub fn has_hard_errors(&self) -> bool {
        !self.error_summary.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.has_hard_errors()
    }

    pub fn invalid_rows(&self) -> usize {
        self.total_rows - self.valid_rows
    }
}

/// What the file auditor produces for one submitted file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuditOutcome {
    /// File was read; it may still carry errors
    Audited(FileAuditResult),
    /// No candidate encoding produced a table; the file is excluded
    Unreadable { file_name: String, reason: String },
}

impl AuditOutcome {
    pub fn file_name(&self) -> &str {
        match self {
            AuditOutcome::Audited(result) => &result.file_name,
            AuditOutcome::Unreadable { file_name, .. } => file_name,
        }
    }
}
