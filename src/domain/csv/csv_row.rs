// ============================================================
// CSV ROW TYPES
// ============================================================
// In-memory tables as parsed from an uploaded submission

use serde::{Deserialize, Serialize};

/// A single data row; cells are aligned with the table headers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    /// Row index (0-based, header excluded)
    pub index: usize,

    /// Cell values; None when the cell is missing or empty
    pub cells: Vec<Option<String>>,
}

impl CsvRow {
    /// Create a new CSV row
    pub fn new(index: usize, cells: Vec<Option<String>>) -> Self {
        Self { index, cells }
    }

    /// Cell value at a column position
    pub fn get(&self, column: usize) -> Option<&str> {
        self.cells.get(column).and_then(|c| c.as_deref())
    }

    /// 1-based line number in the source file (line 1 is the header)
    pub fn line_number(&self) -> usize {
        self.index + 2
    }
}

/// Parsed table with its original headers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<CsvRow>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a header, matched exactly
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Value of `header` in `row`, matched exactly
    pub fn value<'r>(&self, row: &'r CsvRow, header: &str) -> Option<&'r str> {
        self.column(header).and_then(|column| row.get(column))
    }
}
