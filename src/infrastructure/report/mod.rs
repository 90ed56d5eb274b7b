// ============================================================
// REPORT EXPORT
// ============================================================
// Unit tables written as a workbook or a flat CSV file

mod csv_report;
mod xlsx_report;

pub use csv_report::{write_csv_report, write_csv_report_to_path};
pub use xlsx_report::{build_workbook, sanitize_sheet_name, write_workbook, MAX_SHEET_NAME_CHARS};

use chrono::{DateTime, Local};

use crate::domain::audit::UnitSummary;

/// Columns of a unit table, in order
pub const REPORT_HEADERS: [&str; 6] = [
    "Campus",
    "Submitted",
    "Errors",
    "Complete",
    "Total Rows",
    "Valid Rows",
];

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}

/// Text cells of one unit row, aligned with `REPORT_HEADERS`
pub(crate) fn unit_cells(unit: &UnitSummary) -> [String; 6] {
    [
        unit.unit_code.clone(),
        yes_no(unit.has_submission).to_string(),
        unit.error_summary.clone(),
        yes_no(unit.is_complete).to_string(),
        unit.total_rows.to_string(),
        unit.valid_rows.to_string(),
    ]
}

/// `Reporte_Auditoria_<label>_<YYYYmmdd_HHMMSS>.xlsx`
pub fn default_report_name(label: &str, now: DateTime<Local>) -> String {
    let label: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!(
        "Reporte_Auditoria_{}_{}.xlsx",
        label,
        now.format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_report_name() {
        let now = Local.with_ymd_and_hms(2025, 11, 3, 9, 5, 7).unwrap();
        assert_eq!(
            default_report_name("Atlético y Deportivo", now),
            "Reporte_Auditoria_Atlético_y_Deportivo_20251103_090507.xlsx"
        );
    }

    #[test]
    fn test_unit_cells() {
        let mut unit = UnitSummary::no_submission("MTY");
        unit.has_submission = true;
        unit.total_rows = 4;
        unit.valid_rows = 3;

        assert_eq!(
            unit_cells(&unit),
            [
                "MTY".to_string(),
                "YES".to_string(),
                String::new(),
                "NO".to_string(),
                "4".to_string(),
                "3".to_string(),
            ]
        );
    }
}
