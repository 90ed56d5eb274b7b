// ============================================================
// CATEGORY AGGREGATOR
// ============================================================
// Fold per-file audit outcomes into one row per known unit

use tracing::{debug, warn};

use crate::domain::audit::{
    AuditOutcome, CategoryReport, FileAuditResult, FileCorrection, SkipReason, SkippedFile,
    UnitSummary,
};
use crate::domain::audit_config::SummaryPolicy;
use crate::shared::text::truncate_chars;

/// Error text shown for a unit whose file only has advisories
pub const WARNINGS_ONLY: &str = "Only format warnings";

pub struct CategoryAggregator {
    policy: SummaryPolicy,
    report: CategoryReport,
}

impl CategoryAggregator {
    /// Start with every known unit marked as not submitted
    pub fn new(category: impl Into<String>, unit_codes: &[String], policy: SummaryPolicy) -> Self {
        Self {
            policy,
            report: CategoryReport {
                category: category.into(),
                units: unit_codes.iter().map(UnitSummary::no_submission).collect(),
                skipped: Vec::new(),
                corrections: Vec::new(),
                warnings: Vec::new(),
            },
        }
    }

    pub fn add(&mut self, outcome: AuditOutcome) {
        match outcome {
            AuditOutcome::Unreadable { file_name, reason } => {
                self.skip(file_name, SkipReason::Unreadable(reason));
            }
            AuditOutcome::Audited(result) => self.add_result(result),
        }
    }

    /// Record a file whose processing failed unexpectedly
    pub fn add_failure(&mut self, file_name: impl Into<String>, reason: impl Into<String>) {
        self.skip(file_name.into(), SkipReason::Failed(reason.into()));
    }

    pub fn finish(self) -> CategoryReport {
        self.report
    }

    fn add_result(&mut self, result: FileAuditResult) {
        let Some(code) = result.unit_code.clone() else {
            self.skip(result.file_name, SkipReason::MissingUnitCode);
            return;
        };

        let error_summary = unit_error_text(&result, &self.policy);
        let Some(unit) = self.report.units.iter_mut().find(|u| u.unit_code == code) else {
            self.skip(result.file_name, SkipReason::UnknownUnit(code));
            return;
        };
        if unit.has_submission {
            self.skip(result.file_name, SkipReason::DuplicateUnit(code));
            return;
        }

        unit.has_submission = true;
        unit.is_complete = result.is_complete();
        unit.error_summary = error_summary;
        unit.total_rows = result.total_rows;
        unit.valid_rows = result.valid_rows;
        unit.file_name = Some(result.file_name.clone());
        debug!(unit = %code, complete = unit.is_complete, "Unit updated");

        for warning in result.warnings {
            self.report
                .warnings
                .push((result.file_name.clone(), warning));
        }
        for correction in result.corrections {
            self.report.corrections.push(FileCorrection {
                file_name: result.file_name.clone(),
                correction,
            });
        }
    }

    fn skip(&mut self, file_name: String, reason: SkipReason) {
        warn!(file = %file_name, reason = %reason, "File not counted for any unit");
        self.report.skipped.push(SkippedFile { file_name, reason });
    }
}

/// First hard errors joined with "; " and bounded in length.
/// Advisory-only files get a fixed note instead.
pub fn unit_error_text(result: &FileAuditResult, policy: &SummaryPolicy) -> String {
    if result.has_hard_errors() {
        let joined = result
            .error_summary
            .iter()
            .take(policy.unit_error_count)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("; ");
        truncate_chars(&joined, policy.unit_error_max_chars)
    } else if !result.warnings.is_empty() {
        WARNINGS_ONLY.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::Correction;

    fn units() -> Vec<String> {
        vec!["AGS".to_string(), "MTY".to_string()]
    }

    fn result(file_name: &str, unit: Option<&str>) -> FileAuditResult {
        FileAuditResult {
            file_name: file_name.to_string(),
            category: "Deportivo".to_string(),
            unit_code: unit.map(str::to_string),
            encoding: "UTF-8".to_string(),
            is_canonical_encoding: true,
            total_rows: 3,
            valid_rows: 3,
            error_summary: Vec::new(),
            warnings: Vec::new(),
            corrections: Vec::new(),
            rows: Vec::new(),
        }
    }

    #[test]
    fn test_no_files_gives_one_record_per_unit() {
        let report = CategoryAggregator::new("Deportivo", &units(), SummaryPolicy::default()).finish();

        assert_eq!(report.units.len(), 2);
        assert!(report.units.iter().all(|u| !u.has_submission && !u.is_complete));
        assert_eq!(report.units[0].unit_code, "AGS");
        assert_eq!(report.units[1].unit_code, "MTY");
    }

    #[test]
    fn test_file_with_errors_marks_unit_incomplete() {
        let mut aggregator = CategoryAggregator::new("Deportivo", &units(), SummaryPolicy::default());
        let mut failing = result("Formato_Deportivo_MTY.csv", Some("MTY"));
        failing.valid_rows = 0;
        failing.total_rows = 1;
        failing.error_summary = vec!["Row 2: Identifier must have 9 characters, has 4".to_string()];
        failing.corrections = vec![Correction {
            field: "DISCIPLINA".to_string(),
            row_index: 0,
            original: "futbol americano".to_string(),
            corrected: "Futbol Americano".to_string(),
        }];

        aggregator.add(AuditOutcome::Audited(failing));
        let report = aggregator.finish();

        let mty = report.unit("MTY").unwrap();
        assert!(mty.has_submission);
        assert!(!mty.is_complete);
        assert_eq!(mty.error_summary, "Row 2: Identifier must have 9 characters, has 4");
        assert_eq!(mty.file_name.as_deref(), Some("Formato_Deportivo_MTY.csv"));
        assert!(!report.unit("AGS").unwrap().has_submission);
        assert_eq!(report.corrections.len(), 1);
        assert_eq!(report.submitted_units(), 1);
        assert_eq!(report.complete_units(), 0);
    }

    #[test]
    fn test_warnings_only_is_complete() {
        let mut aggregator = CategoryAggregator::new("Deportivo", &units(), SummaryPolicy::default());
        let mut legacy = result("Formato_Deportivo_AGS.csv", Some("AGS"));
        legacy.is_canonical_encoding = false;
        legacy.warnings = vec!["File is encoded as windows-1252 instead of UTF-8".to_string()];

        aggregator.add(AuditOutcome::Audited(legacy));
        let report = aggregator.finish();

        let ags = report.unit("AGS").unwrap();
        assert!(ags.is_complete);
        assert_eq!(ags.error_summary, WARNINGS_ONLY);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_unmatched_files_are_skipped_with_reason() {
        let mut aggregator = CategoryAggregator::new("Deportivo", &units(), SummaryPolicy::default());
        aggregator.add(AuditOutcome::Audited(result("deportes.csv", None)));
        aggregator.add(AuditOutcome::Audited(result("Formato_Deportivo_QRO.csv", Some("QRO"))));
        aggregator.add(AuditOutcome::Unreadable {
            file_name: "broken.csv".to_string(),
            reason: "no encoding".to_string(),
        });
        aggregator.add_failure("odd.csv", "panic in parser");

        let report = aggregator.finish();

        assert_eq!(report.submitted_units(), 0);
        let reasons: Vec<&SkipReason> = report.skipped.iter().map(|s| &s.reason).collect();
        assert_eq!(
            reasons,
            vec![
                &SkipReason::MissingUnitCode,
                &SkipReason::UnknownUnit("QRO".to_string()),
                &SkipReason::Unreadable("no encoding".to_string()),
                &SkipReason::Failed("panic in parser".to_string()),
            ]
        );
    }

    #[test]
    fn test_first_file_wins_for_a_unit() {
        let mut aggregator = CategoryAggregator::new("Deportivo", &units(), SummaryPolicy::default());
        aggregator.add(AuditOutcome::Audited(result("first_AGS.csv", Some("AGS"))));
        let mut second = result("second_AGS.csv", Some("AGS"));
        second.total_rows = 99;
        aggregator.add(AuditOutcome::Audited(second));

        let report = aggregator.finish();

        assert_eq!(report.unit("AGS").unwrap().total_rows, 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::DuplicateUnit("AGS".to_string()));
    }

    #[test]
    fn test_unit_error_text_is_bounded() {
        let policy = SummaryPolicy::default();
        let mut noisy = result("x.csv", Some("AGS"));
        noisy.error_summary = vec![
            "a".repeat(100),
            "b".repeat(100),
            "never shown".to_string(),
        ];

        let text = unit_error_text(&noisy, &policy);

        assert_eq!(text.chars().count(), 150);
        assert!(text.ends_with("..."));
        assert!(text.contains("; "));
        assert!(!text.contains("never shown"));
    }

    #[test]
    fn test_unit_error_text_takes_first_two() {
        let mut failing = result("x.csv", Some("AGS"));
        failing.error_summary = vec!["one".to_string(), "two".to_string(), "three".to_string()];

        assert_eq!(unit_error_text(&failing, &SummaryPolicy::default()), "one; two");
    }
}
