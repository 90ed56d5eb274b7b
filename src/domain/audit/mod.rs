// ============================================================
// AUDIT DOMAIN LAYER
// ============================================================
// Results produced by the audit pipeline

pub mod error_summary;
mod outcome;
mod unit_summary;

pub use error_summary::SummaryEntry;
pub use outcome::{AuditOutcome, Correction, FieldValidationOutcome, FileAuditResult, RowOutcome};
pub use unit_summary::{CategoryReport, FileCorrection, SkipReason, SkippedFile, UnitSummary};
