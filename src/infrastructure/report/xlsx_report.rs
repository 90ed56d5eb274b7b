use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use super::{unit_cells, REPORT_HEADERS};
use crate::domain::audit::CategoryReport;
use crate::domain::error::{AppError, Result};

/// Longest sheet name the format accepts
pub const MAX_SHEET_NAME_CHARS: usize = 31;

/// Replace characters sheet names cannot hold and truncate to the limit
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '[' | ']' | ':' | '*' | '?' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();

    if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Sanitized name not yet taken, with a numeric suffix when needed
fn unique_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_sheet_name(name);
    let mut candidate = base.clone();
    let mut counter = 2;

    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({})", counter);
        let keep = MAX_SHEET_NAME_CHARS - suffix.chars().count();
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        counter += 1;
    }

    used.insert(candidate.to_lowercase());
    candidate
}

/// Workbook with one sheet per category
pub fn build_workbook(reports: &[CategoryReport]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let mut used = HashSet::new();

    for report in reports {
        let sheet_name = unique_sheet_name(&report.category, &mut used);
        let sheet = workbook.add_worksheet();
        sheet.set_name(&sheet_name)?;

        for (col, header) in REPORT_HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        }

        for (index, unit) in report.units.iter().enumerate() {
            let row = (index + 1) as u32;
            let cells = unit_cells(unit);
            for (col, value) in cells.iter().take(4).enumerate() {
                sheet.write_string(row, col as u16, value)?;
            }
            sheet.write_number(row, 4, unit.total_rows as f64)?;
            sheet.write_number(row, 5, unit.valid_rows as f64)?;
        }

        sheet.set_column_width(2, 60)?;
    }

    if reports.is_empty() {
        workbook.add_worksheet();
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn write_workbook(reports: &[CategoryReport], path: &Path) -> Result<()> {
    let buffer = build_workbook(reports)?;
    std::fs::write(path, buffer).map_err(|e| {
        AppError::ExportError(format!("Unable to save {}: {}", path.display(), e))
    })?;

    info!(path = %path.display(), sheets = reports.len(), "Workbook written");
    Ok(())
}
