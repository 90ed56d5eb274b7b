//! Audit Service
//!
//! Entry point for auditing batches of submissions:
//! - one category from in-memory files or paths
//! - a whole directory tree with one sub-directory per category
//!
//! Each file yields exactly one outcome and a failing file never aborts
//! the batch. One fuzzy matcher (and its cache) serves the whole run.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::category_aggregator::CategoryAggregator;
use super::file_auditor::FileAuditor;
use super::fuzzy_matcher::FuzzyMatcher;
use crate::domain::audit::{CategoryReport, SkipReason, SkippedFile};
use crate::domain::audit_config::AuditConfig;
use crate::domain::error::{AppError, Result};
use crate::domain::resolver::ExternalResolver;

/// A submission as received: file name plus raw bytes
#[derive(Debug, Clone)]
pub struct SubmittedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SubmittedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping only its base name
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|e| AppError::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self { file_name, bytes })
    }
}

pub struct AuditService {
    config: AuditConfig,
    matcher: FuzzyMatcher,
}

impl AuditService {
    pub fn new(config: AuditConfig) -> Self {
        let matcher = FuzzyMatcher::new(config.matcher.clone(), &config.aliases);
        Self { config, matcher }
    }

    /// Consult `resolver` when local matching finds nothing
    pub fn with_external(mut self, resolver: Box<dyn ExternalResolver>) -> Self {
        info!(resolver = resolver.name(), "External resolver enabled");
        self.matcher = self.matcher.with_external(resolver);
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Audit in-memory files of one category
    pub fn audit_category(
        &mut self,
        category: &str,
        files: Vec<SubmittedFile>,
    ) -> Result<CategoryReport> {
        let auditor = FileAuditor::new(&self.config, category)?;
        let mut aggregator = CategoryAggregator::new(
            category,
            &self.config.unit_codes,
            self.config.summary.clone(),
        );

        info!(category, files = files.len(), "Auditing category");
        for file in files {
            let matcher = &mut self.matcher;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                auditor.audit(&file.file_name, &file.bytes, matcher)
            }));

            match outcome {
                Ok(outcome) => {
                    debug!(file = outcome.file_name(), "Outcome recorded");
                    aggregator.add(outcome)
                }
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    error!(file = %file.file_name, reason = %reason, "Unexpected failure while auditing");
                    aggregator.add_failure(file.file_name, reason);
                }
            }
        }

        let report = aggregator.finish();
        info!(
            category,
            submitted = report.submitted_units(),
            complete = report.complete_units(),
            skipped = report.skipped.len(),
            "Category audited"
        );
        Ok(report)
    }

    /// Audit files on disk; unreadable paths are reported as failed files
    pub fn audit_paths(&mut self, category: &str, paths: &[PathBuf]) -> Result<CategoryReport> {
        let mut files = Vec::new();
        let mut failures = Vec::new();

        for path in paths {
            match SubmittedFile::read(path) {
                Ok(file) => files.push(file),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Could not read submission");
                    failures.push((path.display().to_string(), e.to_string()));
                }
            }
        }

        let mut report = self.audit_category(category, files)?;
        for (file_name, reason) in failures {
            report.skipped.push(SkippedFile {
                file_name,
                reason: SkipReason::Failed(reason),
            });
        }
        Ok(report)
    }

    /// Audit every configured category from `root/<category>/*.csv`.
    /// A missing sub-directory yields a report with no submissions.
    pub fn audit_directory(&mut self, root: &Path) -> Result<Vec<CategoryReport>> {
        if !root.is_dir() {
            return Err(AppError::NotFound(format!(
                "Directory {} does not exist",
                root.display()
            )));
        }

        let categories: Vec<String> = self.config.categories.keys().cloned().collect();
        let mut reports = Vec::with_capacity(categories.len());

        for category in categories {
            let dir = root.join(&category);
            let paths = if dir.is_dir() {
                csv_files(&dir)?
            } else {
                warn!(category = %category, dir = %dir.display(), "No directory for category");
                Vec::new()
            };
            reports.push(self.audit_paths(&category, &paths)?);
        }

        Ok(reports)
    }
}

/// `*.csv` files directly inside `dir`, sorted by name
fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit_config::fixtures::sample_config;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    const HEADER: &str =
        "EJERCICIO_ACADEMICO,NOMBRE,APELLIDO PATERNO,MATRICULA,CLAVE,DISCIPLINA,RAMA\n";

    fn deportivo_file(name: &str, rows: &[&str]) -> SubmittedFile {
        let mut content = HEADER.to_string();
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        SubmittedFile::new(name, content.into_bytes())
    }

    #[test]
    fn test_batch_never_fails_atomically() {
        let mut service = AuditService::new(sample_config());
        let files = vec![
            deportivo_file(
                "Formato_Deportivo_MTY.csv",
                &["202511,Luis,Pérez,123,1.1,futbol americano,Varonil"],
            ),
            deportivo_file(
                "Formato_Deportivo_AGS.csv",
                &["202511,Ana,Ruiz,A01234567,1.2,Tenis,Femenil"],
            ),
            SubmittedFile::new("Formato_Deportivo_XX.csv", Vec::new()),
            deportivo_file("notas.csv", &["202511,Ana,Ruiz,A01234567,1.2,Tenis,Femenil"]),
        ];

        let report = service.audit_category("Deportivo", files).unwrap();

        let mty = report.unit("MTY").unwrap();
        assert!(mty.has_submission);
        assert!(!mty.is_complete);
        assert_eq!(mty.valid_rows, 0);

        let ags = report.unit("AGS").unwrap();
        assert!(ags.is_complete);
        assert_eq!(ags.valid_rows, 1);

        assert_eq!(report.corrections.len(), 1);
        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(report.skipped[0].reason, SkipReason::Unreadable(_)));
        assert_eq!(report.skipped[1].reason, SkipReason::MissingUnitCode);
    }

    #[test]
    fn test_unknown_category_is_an_error() {
        let mut service = AuditService::new(sample_config());
        assert!(matches!(
            service.audit_category("Teatro", Vec::new()),
            Err(AppError::NotFound(_))
        ));
    }

    struct CountingResolver(Rc<Cell<usize>>);

    impl ExternalResolver for CountingResolver {
        fn resolve(&self, _value: &str, _reference: &[String], _field: &str) -> Result<Option<String>> {
            self.0.set(self.0.get() + 1);
            Ok(Some("Atletismo".to_string()))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn test_matcher_cache_spans_the_run() {
        let calls = Rc::new(Cell::new(0));
        let mut service =
            AuditService::new(sample_config()).with_external(Box::new(CountingResolver(calls.clone())));
        let rows = [
            "202511,Ana,Ruiz,A01234567,1.1,carreras,Femenil",
            "202511,Eva,Sosa,A01234568,1.1,carreras,Femenil",
        ];

        let report = service
            .audit_category("Deportivo", vec![deportivo_file("Formato_Deportivo_AGS.csv", &rows)])
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(report.corrections.len(), 2);
        assert!(report.unit("AGS").unwrap().is_complete);
    }

    #[test]
    fn test_audit_directory_covers_every_category() {
        let root = tempdir().unwrap();
        let deportivo = root.path().join("Deportivo");
        fs::create_dir(&deportivo).unwrap();
        fs::write(
            deportivo.join("Formato_Deportivo_AGS.csv"),
            format!("{}202511,Ana,Ruiz,A01234567,1.1,Tenis,Femenil\n", HEADER),
        )
        .unwrap();
        fs::write(deportivo.join("readme.txt"), "ignored").unwrap();

        let mut service = AuditService::new(sample_config());
        let reports = service.audit_directory(root.path()).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].category, "Deportivo");
        assert!(reports[0].unit("AGS").unwrap().is_complete);
        assert_eq!(reports[1].category, "Mentoreo");
        assert_eq!(reports[1].units.len(), 2);
        assert_eq!(reports[1].submitted_units(), 0);
    }

    #[test]
    fn test_missing_path_is_reported_as_failed() {
        let mut service = AuditService::new(sample_config());
        let report = service
            .audit_paths("Deportivo", &[PathBuf::from("/nonexistent/Formato_Deportivo_AGS.csv")])
            .unwrap();

        assert_eq!(report.submitted_units(), 0);
        assert!(matches!(report.skipped[0].reason, SkipReason::Failed(_)));
    }

    #[test]
    fn test_missing_root_directory() {
        let mut service = AuditService::new(sample_config());
        assert!(matches!(
            service.audit_directory(Path::new("/nonexistent/root")),
            Err(AppError::NotFound(_))
        ));
    }
}
