// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// CSV parsing and encoding detection

mod csv_parser;
mod encoding_resolver;

pub use csv_parser::CsvParser;
pub use encoding_resolver::{Detection, EncodingResolver, ResolvedTable};
