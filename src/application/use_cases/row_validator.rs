//! Row-level validation against a category schema
//!
//! Every check runs independently and all failures of a row are collected.
//! Enumeration fields go through the fuzzy matcher; a differing match is a
//! correction, not an error.

use regex::Regex;

use super::fuzzy_matcher::FuzzyMatcher;
use crate::domain::audit::{Correction, FieldValidationOutcome, RowOutcome};
use crate::domain::audit_config::{AuditConfig, CategorySchema, FieldRule, IdentifierRules};
use crate::domain::csv::{CsvRow, NormalizedTable};
use crate::domain::error::{AppError, Result};
use crate::shared::text::non_blank;

/// Normalizes and checks student identifiers
#[derive(Debug, Clone)]
pub struct IdentifierValidator {
    rules: IdentifierRules,
    pattern: Regex,
}

impl IdentifierValidator {
    pub fn new(rules: &IdentifierRules) -> Result<Self> {
        let pattern = Regex::new(&rules.pattern).map_err(|e| {
            AppError::ConfigError(format!("identifier.pattern does not compile: {}", e))
        })?;
        Ok(Self {
            rules: rules.clone(),
            pattern,
        })
    }

    /// Uppercase and prefix the raw value
    pub fn canonicalize(&self, raw: &str) -> String {
        let upper = raw.trim().to_uppercase();
        if upper.starts_with(&self.rules.prefix) {
            upper
        } else {
            format!("{}{}", self.rules.prefix, upper)
        }
    }

    /// Check an identifier cell. The canonical form is attached whenever it
    /// could be computed, valid or not.
    pub fn validate(&self, value: Option<&str>) -> FieldValidationOutcome {
        let Some(raw) = non_blank(value) else {
            return FieldValidationOutcome::invalid("Empty identifier");
        };

        let canonical = self.canonicalize(raw);
        let length = canonical.chars().count();
        if length != self.rules.length {
            return FieldValidationOutcome::invalid_as(
                format!(
                    "Identifier must have {} characters, has {}",
                    self.rules.length, length
                ),
                canonical,
            );
        }
        if !self.pattern.is_match(&canonical) {
            return FieldValidationOutcome::invalid_as(
                format!("Identifier '{}' has an invalid format", canonical),
                canonical,
            );
        }

        FieldValidationOutcome::valid_as(canonical)
    }
}

/// Email must be `{identifier}@{domain}`, compared case-insensitively
pub fn validate_email(
    email: Option<&str>,
    identifier: Option<&str>,
    domain: &str,
) -> FieldValidationOutcome {
    let (Some(email), Some(identifier)) = (non_blank(email), non_blank(identifier)) else {
        return FieldValidationOutcome::invalid("Email or identifier is empty");
    };

    let expected = format!("{}@{}", identifier, domain);
    if email.to_lowercase() == expected.to_lowercase() {
        FieldValidationOutcome::valid()
    } else {
        FieldValidationOutcome::invalid(format!("Email must be {}", expected))
    }
}

/// Outcome of one row plus the corrections accepted along the way
#[derive(Debug, Clone, PartialEq)]
pub struct RowValidation {
    pub outcome: RowOutcome,
    pub corrections: Vec<Correction>,
}

pub struct RowValidator<'a> {
    config: &'a AuditConfig,
    schema: &'a CategorySchema,
    identifier: IdentifierValidator,
    special_rules: Vec<(&'a str, FieldRule<'a>)>,
}

impl<'a> RowValidator<'a> {
    pub fn new(config: &'a AuditConfig, schema: &'a CategorySchema) -> Result<Self> {
        let special_rules = schema
            .special_fields
            .iter()
            .map(|special| {
                config
                    .rule_for(special)
                    .map(|rule| (special.field.as_str(), rule))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            schema,
            identifier: IdentifierValidator::new(&config.identifier)?,
            special_rules,
        })
    }

    pub fn validate(
        &self,
        table: &NormalizedTable<'_>,
        row: &CsvRow,
        matcher: &mut FuzzyMatcher,
    ) -> RowValidation {
        let mut errors = Vec::new();
        let mut corrections = Vec::new();
        let mut collect = |outcome: FieldValidationOutcome| {
            if let Some(message) = outcome.error_message {
                errors.push(message);
            }
        };

        if let Some(field) = &self.schema.term_field {
            collect(self.check_term(table.value(row, field)));
        }

        for field in &self.schema.required_text_fields {
            collect(check_required(field, table.value(row, field)));
        }

        let mut identifier = None;
        if let Some(field) = &self.schema.identifier_field {
            let raw = table.value(row, field);
            let outcome = self.identifier.validate(raw);
            identifier = outcome
                .corrected_value
                .clone()
                .or_else(|| non_blank(raw).map(str::to_uppercase));
            collect(outcome);
        }

        if let Some(field) = &self.schema.code_field {
            collect(self.check_code(table.value(row, field)));
        }

        for (field, rule) in &self.special_rules {
            let raw = table.value(row, field);
            let outcome = match rule {
                FieldRule::Required => check_required(field, raw),
                FieldRule::EmailFromId => {
                    validate_email(raw, identifier.as_deref(), &self.config.email_domain)
                }
                FieldRule::Enumeration(options) => {
                    let outcome = self.check_enumeration(field, raw, options, matcher);
                    if let (Some(original), Some(corrected)) =
                        (non_blank(raw), outcome.corrected_value.as_deref())
                    {
                        if outcome.is_valid && original != corrected {
                            corrections.push(Correction {
                                field: field.to_string(),
                                row_index: row.index,
                                original: original.to_string(),
                                corrected: corrected.to_string(),
                            });
                        }
                    }
                    outcome
                }
            };
            collect(outcome);
        }

        RowValidation {
            outcome: RowOutcome::new(row.index, errors),
            corrections,
        }
    }

    fn check_term(&self, value: Option<&str>) -> FieldValidationOutcome {
        match non_blank(value) {
            Some(term) if term == self.config.academic_term => FieldValidationOutcome::valid(),
            _ => FieldValidationOutcome::invalid(format!(
                "Academic term must be '{}'",
                self.config.academic_term
            )),
        }
    }

    fn check_code(&self, value: Option<&str>) -> FieldValidationOutcome {
        if self.schema.valid_codes.is_empty() {
            return FieldValidationOutcome::valid();
        }

        let code = non_blank(value).unwrap_or("");
        if self.schema.valid_codes.iter().any(|valid| valid == code) {
            FieldValidationOutcome::valid()
        } else {
            FieldValidationOutcome::invalid(format!("Key code '{}' is not valid", code))
        }
    }

    fn check_enumeration(
        &self,
        field: &str,
        value: Option<&str>,
        options: &[String],
        matcher: &mut FuzzyMatcher,
    ) -> FieldValidationOutcome {
        let Some(raw) = non_blank(value) else {
            return FieldValidationOutcome::invalid(format!("{} cannot be empty", field));
        };

        if options.iter().any(|option| option == raw) {
            return FieldValidationOutcome::valid();
        }

        let not_valid = || FieldValidationOutcome::invalid(format!("{} '{}' is not valid", field, raw));
        if !self.config.is_correctable(field) {
            return not_valid();
        }

        match matcher.resolve_field(field, raw, options) {
            Some(m) => FieldValidationOutcome::valid_as(m.value),
            None => not_valid(),
        }
    }
}

fn check_required(field: &str, value: Option<&str>) -> FieldValidationOutcome {
    match non_blank(value) {
        Some(_) => FieldValidationOutcome::valid(),
        None => FieldValidationOutcome::invalid(format!("{} cannot be empty", field)),
    }
}
