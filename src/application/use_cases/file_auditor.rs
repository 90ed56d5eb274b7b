// ============================================================
// FILE AUDITOR USE CASE
// ============================================================
// Run one submitted file through decoding, unit detection,
// header normalization and row validation

use regex::Regex;
use std::path::Path;
use tracing::{debug, info, warn};

use super::fuzzy_matcher::FuzzyMatcher;
use super::row_validator::RowValidator;
use super::schema_normalizer::SchemaNormalizer;
use crate::domain::audit::error_summary::{entries_from_rows, summarize};
use crate::domain::audit::{AuditOutcome, FileAuditResult};
use crate::domain::audit_config::{AuditConfig, CategorySchema};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::csv::EncodingResolver;

/// Unit code detected in a file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitCodeMatch {
    /// A known unit
    Found(String),
    /// Name matched but the code is not a known unit
    Unknown(String),
    /// Name does not follow the category's pattern, or carries no known code
    WrongFileName,
}

impl UnitCodeMatch {
    pub fn code(&self) -> Option<&str> {
        match self {
            UnitCodeMatch::Found(code) | UnitCodeMatch::Unknown(code) => Some(code),
            UnitCodeMatch::WrongFileName => None,
        }
    }
}

/// Audits the files of one category
pub struct FileAuditor<'a> {
    config: &'a AuditConfig,
    category: &'a str,
    schema: &'a CategorySchema,
    file_pattern: Option<Regex>,
    encoding: EncodingResolver,
    validator: RowValidator<'a>,
}

impl<'a> FileAuditor<'a> {
    pub fn new(config: &'a AuditConfig, category: &'a str) -> Result<Self> {
        let schema = config.category(category)?;
        let file_pattern = schema
            .file_name_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    AppError::ConfigError(format!(
                        "{}: file_name_pattern does not compile: {}",
                        category, e
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            config,
            category,
            schema,
            file_pattern,
            encoding: EncodingResolver::new(config.ingest.clone()),
            validator: RowValidator::new(config, schema)?,
        })
    }

    pub fn category(&self) -> &str {
        self.category
    }

    /// Find the unit code in a file name (directories are ignored)
    pub fn extract_unit_code(&self, file_name: &str) -> UnitCodeMatch {
        let base_name = Path::new(file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(file_name);

        match &self.file_pattern {
            Some(pattern) => {
                let Some(code) = pattern
                    .captures(base_name)
                    .and_then(|captures| captures.get(1))
                    .map(|m| m.as_str().to_uppercase())
                else {
                    return UnitCodeMatch::WrongFileName;
                };

                if self.config.unit_codes.contains(&code) {
                    UnitCodeMatch::Found(code)
                } else {
                    UnitCodeMatch::Unknown(code)
                }
            }
            None => self
                .scan_unit_code(base_name)
                .map(UnitCodeMatch::Found)
                .unwrap_or(UnitCodeMatch::WrongFileName),
        }
    }

    /// Known unit code inside a free-form name, case-insensitive.
    /// Whole tokens win over substrings; longer codes are tried first.
    fn scan_unit_code(&self, base_name: &str) -> Option<String> {
        let stem = Path::new(base_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(base_name)
            .to_uppercase();

        let mut codes: Vec<&String> = self.config.unit_codes.iter().collect();
        codes.sort_by_key(|code| std::cmp::Reverse(code.chars().count()));

        let tokens: Vec<&str> = stem
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .collect();

        codes
            .iter()
            .find(|code| tokens.iter().any(|token| token.eq_ignore_ascii_case(code)))
            .or_else(|| codes.iter().find(|code| stem.contains(&code.to_uppercase())))
            .map(|code| code.to_string())
    }

    /// Audit one file. Only an unreadable file is excluded; every other
    /// problem is reported inside the result.
    pub fn audit(&self, file_name: &str, bytes: &[u8], matcher: &mut FuzzyMatcher) -> AuditOutcome {
        let resolved = match self.encoding.resolve(bytes) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(file = file_name, error = %e, "File is unreadable");
                return AuditOutcome::Unreadable {
                    file_name: file_name.to_string(),
                    reason: e.to_string(),
                };
            }
        };

        let unit = self.extract_unit_code(file_name);
        let mut errors = Vec::new();
        match &unit {
            UnitCodeMatch::Found(code) => debug!(file = file_name, unit = %code, "Unit detected"),
            UnitCodeMatch::Unknown(code) => {
                errors.push(format!("Unit code '{}' is not a known unit", code));
            }
            UnitCodeMatch::WrongFileName => {
                errors.push("File name does not identify a known unit".to_string());
            }
        }

        let mut warnings = Vec::new();
        if !resolved.is_canonical {
            warnings.push(format!(
                "File is encoded as {} instead of UTF-8",
                resolved.encoding_label()
            ));
        }

        let mut result = FileAuditResult {
            file_name: file_name.to_string(),
            category: self.category.to_string(),
            unit_code: unit.code().map(str::to_string),
            encoding: resolved.encoding_label().to_string(),
            is_canonical_encoding: resolved.is_canonical,
            total_rows: resolved.table.len(),
            valid_rows: 0,
            error_summary: errors,
            warnings,
            corrections: Vec::new(),
            rows: Vec::new(),
        };

        let mapping = SchemaNormalizer::normalize(&resolved.table.headers, self.schema);
        if !mapping.renames.is_empty() {
            debug!(file = file_name, renames = ?mapping.renames, "Headers mapped to canonical names");
        }
        if let Some(message) = mapping.missing_message() {
            warn!(file = file_name, missing = ?mapping.missing, "Required columns are missing");
            result.error_summary.push(message);
            return AuditOutcome::Audited(result);
        }

        let table = mapping.apply(&resolved.table);
        for row in table.rows() {
            let validation = self.validator.validate(&table, row, matcher);
            result.corrections.extend(validation.corrections);
            result.rows.push(validation.outcome);
        }

        result.valid_rows = result.rows.iter().filter(|row| row.is_valid).count();
        let entries = summarize(
            entries_from_rows(&result.rows),
            self.config.summary.row_error_ceiling,
        );
        result
            .error_summary
            .extend(entries.iter().map(|entry| entry.to_string()));

        info!(
            file = file_name,
            category = self.category,
            unit = ?result.unit_code,
            total = result.total_rows,
            valid = result.valid_rows,
            invalid = result.invalid_rows(),
            corrections = result.corrections.len(),
            "File audited"
        );

        AuditOutcome::Audited(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit_config::fixtures::sample_config;
    use encoding_rs::WINDOWS_1252;

    const DEPORTIVO_HEADER: &str =
        "EJERCICIO_ACADEMICO,NOMBRE,APELLIDO PATERNO,MATRICULA,CLAVE,DISCIPLINA,RAMA\n";

    fn matcher(config: &AuditConfig) -> FuzzyMatcher {
        FuzzyMatcher::new(config.matcher.clone(), &config.aliases)
    }

    fn audited(outcome: AuditOutcome) -> FileAuditResult {
        match outcome {
            AuditOutcome::Audited(result) => result,
            other => panic!("expected an audited file, got {:?}", other),
        }
    }

    #[test]
    fn test_unit_code_from_pattern() {
        let config = sample_config();
        let auditor = FileAuditor::new(&config, "Deportivo").unwrap();

        assert_eq!(
            auditor.extract_unit_code("Formato_Deportivo_MTY.csv"),
            UnitCodeMatch::Found("MTY".to_string())
        );
        assert_eq!(
            auditor.extract_unit_code("uploads/2025/Formato_Deportivo_AGS.csv"),
            UnitCodeMatch::Found("AGS".to_string())
        );
        assert_eq!(
            auditor.extract_unit_code("Formato_Deportivo_QRO.csv"),
            UnitCodeMatch::Unknown("QRO".to_string())
        );
        assert_eq!(
            auditor.extract_unit_code("deportivo_mty.csv"),
            UnitCodeMatch::WrongFileName
        );
        assert_eq!(
            auditor.extract_unit_code("Deportivo MTY.csv"),
            UnitCodeMatch::WrongFileName
        );
    }

    #[test]
    fn test_unit_code_pattern_matches_anywhere_in_name() {
        let config = sample_config();
        let auditor = FileAuditor::new(&config, "Deportivo").unwrap();

        for name in [
            "Copia de Formato_Deportivo_MTY.csv",
            "2025_Formato_Deportivo_MTY.csv",
        ] {
            assert_eq!(
                auditor.extract_unit_code(name),
                UnitCodeMatch::Found("MTY".to_string()),
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_unit_code_scan_without_pattern() {
        let config = sample_config();
        let auditor = FileAuditor::new(&config, "Mentoreo").unwrap();

        assert_eq!(
            auditor.extract_unit_code("mentoreo_mty_final.csv"),
            UnitCodeMatch::Found("MTY".to_string())
        );
        assert_eq!(
            auditor.extract_unit_code("ReporteAGS.csv"),
            UnitCodeMatch::Found("AGS".to_string())
        );
        assert_eq!(
            auditor.extract_unit_code("mentoreo.csv"),
            UnitCodeMatch::WrongFileName
        );
    }

    #[test]
    fn test_end_to_end_single_row() {
        let config = sample_config();
        let auditor = FileAuditor::new(&config, "Deportivo").unwrap();
        let mut matcher = matcher(&config);
        let content = format!(
            "{}202511,Luis,Pérez,123,1.1,futbol americano,Varonil\n",
            DEPORTIVO_HEADER
        );

        let result = audited(auditor.audit(
            "Formato_Deportivo_MTY.csv",
            content.as_bytes(),
            &mut matcher,
        ));

        assert_eq!(result.unit_code.as_deref(), Some("MTY"));
        assert_eq!(result.total_rows, 1);
        assert_eq!(result.valid_rows, 0);
        assert_eq!(
            result.error_summary,
            vec!["Row 2: Identifier must have 9 characters, has 4"]
        );
        assert_eq!(result.corrections.len(), 1);
        assert_eq!(result.corrections[0].original, "futbol americano");
        assert_eq!(result.corrections[0].corrected, "Futbol Americano");
        assert!(result.is_canonical_encoding);
        assert!(!result.is_complete());
    }

    #[test]
    fn test_missing_columns_skip_row_validation() {
        let config = sample_config();
        let auditor = FileAuditor::new(&config, "Deportivo").unwrap();
        let mut matcher = matcher(&config);
        let content = "EJERCICIO_ACADEMICO,NOMBRE,APELLIDO PATERNO,CLAVE,DISCIPLINA,RAMA\n\
                       202511,Ana,Ruiz,1.1,futbol,Femenil\n\
                       202511,Eva,Sosa,1.1,tenis,Femenil\n";

        let result = audited(auditor.audit("Formato_Deportivo_AGS.csv", content.as_bytes(), &mut matcher));

        assert_eq!(result.total_rows, 2);
        assert_eq!(result.valid_rows, 0);
        assert_eq!(result.error_summary, vec!["Missing columns: MATRICULA"]);
        assert!(result.rows.is_empty());
        assert_eq!(matcher.cache_len(), 0);
    }

    #[test]
    fn test_legacy_encoding_is_only_a_warning() {
        let config = sample_config();
        let auditor = FileAuditor::new(&config, "Deportivo").unwrap();
        let mut matcher = matcher(&config);
        let content = format!(
            "{}202511,José,Núñez,A01234567,1.2,Natación,Femenil\n",
            DEPORTIVO_HEADER
        );
        let (bytes, _, _) = WINDOWS_1252.encode(&content);

        let result = audited(auditor.audit("Formato_Deportivo_AGS.csv", &bytes, &mut matcher));

        assert!(!result.is_canonical_encoding);
        assert_eq!(result.valid_rows, 1);
        assert!(result.error_summary.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.is_complete());
    }

    #[test]
    fn test_many_row_errors_are_collapsed() {
        let config = sample_config();
        let auditor = FileAuditor::new(&config, "Deportivo").unwrap();
        let mut matcher = matcher(&config);
        let mut content = DEPORTIVO_HEADER.to_string();
        for _ in 0..7 {
            content.push_str("202410,Ana,Ruiz,A01234567,1.1,Tenis,Femenil\n");
        }

        let result = audited(auditor.audit("Formato_Deportivo_AGS.csv", content.as_bytes(), &mut matcher));

        assert_eq!(result.valid_rows, 0);
        assert_eq!(result.rows.len(), 7);
        assert_eq!(result.error_summary, vec!["Academic term must be '202511': 7 cases"]);
    }

    #[test]
    fn test_wrong_file_name_is_a_hard_error() {
        let config = sample_config();
        let auditor = FileAuditor::new(&config, "Deportivo").unwrap();
        let mut matcher = matcher(&config);
        let content = format!(
            "{}202511,Ana,Ruiz,A01234567,1.1,Tenis,Femenil\n",
            DEPORTIVO_HEADER
        );

        let result = audited(auditor.audit("deportes.csv", content.as_bytes(), &mut matcher));

        assert_eq!(result.unit_code, None);
        assert_eq!(result.valid_rows, 1);
        assert_eq!(
            result.error_summary,
            vec!["File name does not identify a known unit"]
        );
    }

    #[test]
    fn test_unreadable_file_is_excluded() {
        let config = sample_config();
        let auditor = FileAuditor::new(&config, "Deportivo").unwrap();
        let mut matcher = matcher(&config);

        let outcome = auditor.audit("Formato_Deportivo_AGS.csv", b"", &mut matcher);

        assert!(matches!(outcome, AuditOutcome::Unreadable { .. }));
        assert_eq!(outcome.file_name(), "Formato_Deportivo_AGS.csv");
    }

    #[test]
    fn test_unknown_category() {
        let config = sample_config();
        assert!(matches!(
            FileAuditor::new(&config, "Teatro"),
            Err(AppError::NotFound(_))
        ));
    }
}
