// ============================================================
// NORMALIZED TABLE
// ============================================================
// A raw table viewed through canonical column names

use std::collections::HashMap;

use super::{CsvRow, RawTable};

/// Raw table plus a canonical field name → column position mapping
#[derive(Debug, Clone)]
pub struct NormalizedTable<'a> {
    table: &'a RawTable,
    columns: HashMap<String, usize>,
}

impl<'a> NormalizedTable<'a> {
    pub fn new(table: &'a RawTable, columns: HashMap<String, usize>) -> Self {
        Self { table, columns }
    }

    pub fn rows(&self) -> &'a [CsvRow] {
        &self.table.rows
    }

    /// Cell value of a canonical field in `row`
    pub fn value<'r>(&self, row: &'r CsvRow, field: &str) -> Option<&'r str> {
        self.columns.get(field).and_then(|column| row.get(*column))
    }
}
