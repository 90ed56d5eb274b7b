use csv::Writer;
use std::io::Write;
use std::path::Path;

use super::{unit_cells, REPORT_HEADERS};
use crate::domain::audit::CategoryReport;
use crate::domain::error::Result;

/// All unit tables as one flat CSV, prefixed with the category column
pub fn write_csv_report<W: Write>(reports: &[CategoryReport], output: W) -> Result<()> {
    let mut writer = Writer::from_writer(output);

    let mut headers = vec!["Category"];
    headers.extend(REPORT_HEADERS);
    writer.write_record(&headers)?;

    for report in reports {
        for unit in &report.units {
            let cells = unit_cells(unit);
            writer.write_record(std::iter::once(report.category.as_str()).chain(cells.iter().map(String::as_str)))?;
        }
    }

    writer.flush()?;
    Ok(())
}

pub fn write_csv_report_to_path(reports: &[CategoryReport], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv_report(reports, file)
}
