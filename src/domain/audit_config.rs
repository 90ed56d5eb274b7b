// ============================================================
// AUDIT CONFIGURATION
// ============================================================
// Reference dictionaries, category schemas and tuning values.
// Loaded once at startup and shared read-only by every auditor.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::error::{AppError, Result};

/// Complete reference configuration for one deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Known organizational units (campus codes)
    pub unit_codes: Vec<String>,

    /// Literal every row's fixed-term field must carry (e.g. "202511")
    pub academic_term: String,

    /// Domain used to derive institutional emails from identifiers
    pub email_domain: String,

    #[serde(default)]
    pub identifier: IdentifierRules,

    #[serde(default)]
    pub ingest: IngestSettings,

    #[serde(default)]
    pub matcher: MatcherSettings,

    #[serde(default)]
    pub summary: SummaryPolicy,

    /// Fields whose values are never auto-corrected
    #[serde(default)]
    pub non_correctable_fields: Vec<String>,

    /// Curated misspelling → canonical value table, keys compared folded
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,

    /// Named closed vocabularies referenced by enumeration fields
    #[serde(default)]
    pub reference_lists: BTreeMap<String, Vec<String>>,

    /// Category name → schema
    pub categories: BTreeMap<String, CategorySchema>,
}

/// Shape of the student identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierRules {
    /// Leading letter added when missing
    pub prefix: String,
    /// Exact length in characters after normalization
    pub length: usize,
    /// Full-match pattern for the normalized identifier
    pub pattern: String,
}

impl Default for IdentifierRules {
    fn default() -> Self {
        Self {
            prefix: "A".to_string(),
            length: 9,
            pattern: r"^A\d{8}$".to_string(),
        }
    }
}

/// Encoding detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Bytes fed to the statistical detector
    pub sample_bytes: usize,
    /// Detector guesses below this confidence are ignored
    pub min_detection_confidence: f32,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            sample_bytes: 10_000,
            min_detection_confidence: 0.7,
        }
    }
}

/// Thresholds for the fuzzy matcher tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherSettings {
    /// Minimum similarity ratio accepted by the ratio tier
    pub min_similarity: f64,
    /// Substring tier only applies when the folded value is longer than this
    pub min_substring_len: usize,
    /// Edit-distance threshold as a share of the average length
    pub edit_distance_ratio: f64,
    /// Upper bound for the edit-distance threshold
    pub max_edit_distance: usize,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            min_similarity: 0.6,
            min_substring_len: 3,
            edit_distance_ratio: 0.3,
            max_edit_distance: 3,
        }
    }
}

/// Presentation bounds for error text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryPolicy {
    /// Above this many row errors a file's messages are collapsed into counts
    pub row_error_ceiling: usize,
    /// Hard errors quoted in a unit summary
    pub unit_error_count: usize,
    /// Character bound of a unit summary's error text
    pub unit_error_max_chars: usize,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self {
            row_error_ceiling: 5,
            unit_error_count: 2,
            unit_error_max_chars: 150,
        }
    }
}

/// Validation schema of one submission category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySchema {
    /// Pattern with exactly one capture group for the unit code.
    /// Without it the file name is scanned for any known unit code.
    #[serde(default)]
    pub file_name_pattern: Option<String>,

    /// Canonical column names that must be present
    pub required_fields: Vec<String>,

    /// Allowed key codes; empty disables the check
    #[serde(default)]
    pub valid_codes: Vec<String>,

    /// Column holding the academic term literal
    #[serde(default)]
    pub term_field: Option<String>,

    /// Column holding the student identifier
    #[serde(default)]
    pub identifier_field: Option<String>,

    /// Column holding the key code
    #[serde(default)]
    pub code_field: Option<String>,

    /// Free-text columns that must not be blank (names, surnames)
    #[serde(default)]
    pub required_text_fields: Vec<String>,

    /// Extra per-field rules, evaluated in order
    #[serde(default)]
    pub special_fields: Vec<SpecialField>,
}

/// A per-field rule as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialField {
    pub field: String,
    pub kind: FieldKind,
    /// Reference list name, required for `enumeration`
    #[serde(default)]
    pub list: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Any non-blank content
    Required,
    /// Value must resolve against a reference list
    Enumeration,
    /// Must equal `{identifier}@{email_domain}`, case-insensitive
    EmailFromId,
}

/// A per-field rule with its reference list resolved
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule<'a> {
    Required,
    Enumeration(&'a [String]),
    EmailFromId,
}

impl AuditConfig {
    /// Look up a category schema by name
    pub fn category(&self, name: &str) -> Result<&CategorySchema> {
        self.categories
            .get(name)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Unknown category '{}' (configured: {})",
                    name,
                    self.category_names().join(", ")
                ))
            })
    }

    /// Names of all configured categories
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.keys().map(String::as_str).collect()
    }

    /// Resolve a special field to its executable rule
    pub fn rule_for<'a>(&'a self, special: &SpecialField) -> Result<FieldRule<'a>> {
        match special.kind {
            FieldKind::Required => Ok(FieldRule::Required),
            FieldKind::EmailFromId => Ok(FieldRule::EmailFromId),
            FieldKind::Enumeration => {
                let list_name = special.list.as_deref().ok_or_else(|| {
                    AppError::ConfigError(format!(
                        "Field '{}' is an enumeration without a reference list",
                        special.field
                    ))
                })?;
                self.reference_lists
                    .get(list_name)
                    .map(|values| FieldRule::Enumeration(values.as_slice()))
                    .ok_or_else(|| {
                        AppError::ConfigError(format!(
                            "Field '{}' references unknown list '{}'",
                            special.field, list_name
                        ))
                    })
            }
        }
    }

    /// Whether values of `field` may be auto-corrected
    pub fn is_correctable(&self, field: &str) -> bool {
        !self.non_correctable_fields.iter().any(|f| f == field)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.unit_codes.is_empty() {
            return Err(AppError::ConfigError("unit_codes must not be empty".to_string()));
        }
        if self.academic_term.trim().is_empty() {
            return Err(AppError::ConfigError("academic_term must not be empty".to_string()));
        }
        if self.categories.is_empty() {
            return Err(AppError::ConfigError("at least one category is required".to_string()));
        }
        if !(0.0..=1.0).contains(&self.matcher.min_similarity) {
            return Err(AppError::ConfigError(
                "matcher.min_similarity must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.ingest.min_detection_confidence) {
            return Err(AppError::ConfigError(
                "ingest.min_detection_confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.ingest.sample_bytes == 0 {
            return Err(AppError::ConfigError("ingest.sample_bytes must be > 0".to_string()));
        }
        Regex::new(&self.identifier.pattern).map_err(|e| {
            AppError::ConfigError(format!("identifier.pattern does not compile: {}", e))
        })?;

        for (name, schema) in &self.categories {
            self.validate_category(name, schema)?;
        }

        Ok(())
    }

    fn validate_category(&self, name: &str, schema: &CategorySchema) -> Result<()> {
        if let Some(pattern) = &schema.file_name_pattern {
            let regex = Regex::new(pattern).map_err(|e| {
                AppError::ConfigError(format!("{}: file_name_pattern does not compile: {}", name, e))
            })?;
            if regex.captures_len() != 2 {
                return Err(AppError::ConfigError(format!(
                    "{}: file_name_pattern must have exactly one capture group",
                    name
                )));
            }
        }

        let role_fields = schema
            .term_field
            .iter()
            .chain(schema.identifier_field.iter())
            .chain(schema.code_field.iter())
            .chain(schema.required_text_fields.iter())
            .chain(schema.special_fields.iter().map(|s| &s.field));

        for field in role_fields {
            if !schema.required_fields.contains(field) {
                return Err(AppError::ConfigError(format!(
                    "{}: field '{}' is validated but not listed in required_fields",
                    name, field
                )));
            }
        }

        let has_email_rule = schema
            .special_fields
            .iter()
            .any(|s| s.kind == FieldKind::EmailFromId);
        if has_email_rule && schema.identifier_field.is_none() {
            return Err(AppError::ConfigError(format!(
                "{}: email_from_id needs an identifier_field",
                name
            )));
        }

        for special in &schema.special_fields {
            self.rule_for(special)?;
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    /// Small two-unit deployment with one enumeration category and one email category
    pub fn sample_config() -> AuditConfig {
        let mut reference_lists = BTreeMap::new();
        reference_lists.insert(
            "disciplinas".to_string(),
            strings(&["Atletismo", "Futbol Americano", "Futbol Soccer", "Natación", "Tenis"]),
        );
        reference_lists.insert("ramas".to_string(), strings(&["Femenil", "Varonil", "Mixto"]));

        let mut aliases = BTreeMap::new();
        aliases.insert("femenino".to_string(), "Femenil".to_string());
        aliases.insert("masculino".to_string(), "Varonil".to_string());

        let mut categories = BTreeMap::new();
        categories.insert(
            "Deportivo".to_string(),
            CategorySchema {
                file_name_pattern: Some(r"Formato_Deportivo_([A-Z]{2,3})\.csv".to_string()),
                required_fields: strings(&[
                    "EJERCICIO_ACADEMICO",
                    "NOMBRE",
                    "APELLIDO PATERNO",
                    "MATRICULA",
                    "CLAVE",
                    "DISCIPLINA",
                    "RAMA",
                ]),
                valid_codes: strings(&["1.1", "1.2"]),
                term_field: Some("EJERCICIO_ACADEMICO".to_string()),
                identifier_field: Some("MATRICULA".to_string()),
                code_field: Some("CLAVE".to_string()),
                required_text_fields: strings(&["NOMBRE", "APELLIDO PATERNO"]),
                special_fields: vec![
                    SpecialField {
                        field: "DISCIPLINA".to_string(),
                        kind: FieldKind::Enumeration,
                        list: Some("disciplinas".to_string()),
                    },
                    SpecialField {
                        field: "RAMA".to_string(),
                        kind: FieldKind::Enumeration,
                        list: Some("ramas".to_string()),
                    },
                ],
            },
        );
        categories.insert(
            "Mentoreo".to_string(),
            CategorySchema {
                file_name_pattern: None,
                required_fields: strings(&["Ejercicio Académico", "Matrícula", "Nombre completo", "Email"]),
                valid_codes: Vec::new(),
                term_field: Some("Ejercicio Académico".to_string()),
                identifier_field: Some("Matrícula".to_string()),
                code_field: None,
                required_text_fields: strings(&["Nombre completo"]),
                special_fields: vec![SpecialField {
                    field: "Email".to_string(),
                    kind: FieldKind::EmailFromId,
                    list: None,
                }],
            },
        );

        AuditConfig {
            unit_codes: strings(&["AGS", "MTY"]),
            academic_term: "202511".to_string(),
            email_domain: "tec.mx".to_string(),
            identifier: IdentifierRules::default(),
            ingest: IngestSettings::default(),
            matcher: MatcherSettings::default(),
            summary: SummaryPolicy::default(),
            non_correctable_fields: strings(&["NOMBRE", "Nombre completo"]),
            aliases,
            reference_lists,
            categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_config;
    use super::*;

    #[test]
    fn test_sample_config_is_valid() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_unknown_category() {
        let config = sample_config();
        assert!(matches!(config.category("Nope"), Err(AppError::NotFound(_))));
        assert!(config.category("Mentoreo").is_ok());
    }

    #[test]
    fn test_enumeration_without_known_list_is_rejected() {
        let mut config = sample_config();
        let schema = config.categories.get_mut("Deportivo").unwrap();
        schema.special_fields[0].list = Some("missing".to_string());

        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_pattern_needs_one_capture_group() {
        let mut config = sample_config();
        let schema = config.categories.get_mut("Deportivo").unwrap();
        schema.file_name_pattern = Some(r"Formato_Deportivo_[A-Z]+\.csv".to_string());

        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_role_field_must_be_required() {
        let mut config = sample_config();
        let schema = config.categories.get_mut("Deportivo").unwrap();
        schema.required_fields.retain(|f| f != "RAMA");

        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_rule_for_resolves_reference_list() {
        let config = sample_config();
        let schema = config.category("Deportivo").unwrap();
        let rule = config.rule_for(&schema.special_fields[1]).unwrap();

        match rule {
            FieldRule::Enumeration(values) => assert_eq!(values.len(), 3),
            other => panic!("unexpected rule {:?}", other),
        }
    }

    #[test]
    fn test_is_correctable() {
        let config = sample_config();
        assert!(!config.is_correctable("NOMBRE"));
        assert!(config.is_correctable("DISCIPLINA"));
    }
}
