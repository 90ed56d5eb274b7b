// ============================================================
// CSV DOMAIN LAYER
// ============================================================
// Tabular value objects shared by ingestion and validation
// No I/O, no async, no external dependencies

mod csv_row;
mod normalized_table;

pub use csv_row::{CsvRow, RawTable};
pub use normalized_table::NormalizedTable;
