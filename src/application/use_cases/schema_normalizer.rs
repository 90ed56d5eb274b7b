//! Maps a submission's actual headers onto a category's canonical field names
//!
//! Headers match when they are equal after lowercasing and dropping spaces
//! and underscores, so "APELLIDO_PATERNO" satisfies "APELLIDO PATERNO".

use std::collections::HashMap;

use crate::domain::audit_config::CategorySchema;
use crate::domain::csv::{NormalizedTable, RawTable};
use crate::shared::text::header_key;

/// Header resolution of one table against one schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMapping {
    /// (actual header, canonical name) for every header that needed renaming
    pub renames: Vec<(String, String)>,
    /// Canonical name → column position
    pub columns: HashMap<String, usize>,
    /// Required canonical names with no equivalent header, in schema order
    pub missing: Vec<String>,
}

impl SchemaMapping {
    /// "Missing columns: a, b"
    pub fn missing_message(&self) -> Option<String> {
        if self.missing.is_empty() {
            None
        } else {
            Some(format!("Missing columns: {}", self.missing.join(", ")))
        }
    }

    /// View `table` through the canonical names
    pub fn apply<'a>(&self, table: &'a RawTable) -> NormalizedTable<'a> {
        NormalizedTable::new(table, self.columns.clone())
    }
}

pub struct SchemaNormalizer;

impl SchemaNormalizer {
    /// Resolve every required field of `schema` among `headers`.
    /// The first equivalent header wins.
    pub fn normalize(headers: &[String], schema: &CategorySchema) -> SchemaMapping {
        let keys: Vec<String> = headers.iter().map(|h| header_key(h)).collect();
        let mut mapping = SchemaMapping::default();

        for field in &schema.required_fields {
            let wanted = header_key(field);
            match keys.iter().position(|key| *key == wanted) {
                Some(column) => {
                    if headers[column] != *field {
                        mapping.renames.push((headers[column].clone(), field.clone()));
                    }
                    mapping.columns.insert(field.clone(), column);
                }
                None => mapping.missing.push(field.clone()),
            }
        }

        mapping
    }
}
