// ============================================================
// CSV PARSER
// ============================================================
// Parse decoded CSV text into a raw table

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::domain::csv::{CsvRow, RawTable};
use crate::domain::error::AppError;

/// CSV parser for already-decoded text
#[derive(Debug, Clone)]
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,

    /// Whether to trim whitespace from headers and values
    trim: bool,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim: true,
        }
    }
}

impl CsvParser {
    /// Create a new CSV parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse CSV content from string.
    /// Content without a usable header row is rejected as empty.
    pub fn parse_content(&self, content: &str) -> Result<RawTable, AppError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(if self.trim { Trim::All } else { Trim::None })
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .clone();

        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(AppError::ParseError("No columns to parse from file".to_string()));
        }

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            rows.push(self.parse_row(index, &headers, &record));
        }

        Ok(RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows,
        ))
    }

    /// Parse a single CSV row; missing or empty cells become None
    fn parse_row(&self, index: usize, headers: &StringRecord, record: &StringRecord) -> CsvRow {
        let cells = (0..headers.len())
            .map(|idx| {
                record
                    .get(idx)
                    .filter(|value| !value.is_empty())
                    .map(|value| value.to_string())
            })
            .collect();

        CsvRow::new(index, cells)
    }
}
