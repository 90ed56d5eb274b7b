// ============================================================
// ERROR SUMMARY
// ============================================================
// Bounded presentation of row-level errors.
// Collapsing only changes how errors are shown, never row validity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::RowOutcome;

/// One line of a file's error summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    /// Source line the error came from; None once collapsed
    pub line: Option<usize>,
    pub message: String,
    pub count: usize,
}

impl SummaryEntry {
    pub fn at_line(line: usize, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            message: message.into(),
            count: 1,
        }
    }
}

impl fmt::Display for SummaryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Row {}: {}", line, self.message),
            None => write!(f, "{}: {} cases", self.message, self.count),
        }
    }
}

/// Flatten row outcomes into verbatim entries, one per error
pub fn entries_from_rows(rows: &[RowOutcome]) -> Vec<SummaryEntry> {
    rows.iter()
        .flat_map(|row| {
            row.errors
                .iter()
                .map(move |message| SummaryEntry::at_line(row.line_number(), message.clone()))
        })
        .collect()
}

/// Merge entries sharing a message into one counted entry.
/// Order follows the first occurrence of each message.
pub fn collapse(entries: &[SummaryEntry]) -> Vec<SummaryEntry> {
    let mut collapsed: Vec<SummaryEntry> = Vec::new();

    for entry in entries {
        match collapsed.iter_mut().find(|c| c.message == entry.message) {
            Some(existing) => existing.count += entry.count,
            None => collapsed.push(SummaryEntry {
                line: None,
                message: entry.message.clone(),
                count: entry.count,
            }),
        }
    }

    collapsed
}

/// Keep entries verbatim up to `ceiling` errors, collapse above it
pub fn summarize(entries: Vec<SummaryEntry>, ceiling: usize) -> Vec<SummaryEntry> {
    let total: usize = entries.iter().map(|e| e.count).sum();
    if total > ceiling {
        collapse(&entries)
    } else {
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(messages: &[&str]) -> Vec<SummaryEntry> {
        messages
            .iter()
            .enumerate()
            .map(|(i, m)| SummaryEntry::at_line(i + 2, *m))
            .collect()
    }

    #[test]
    fn test_below_ceiling_is_verbatim() {
        let summary = summarize(entries(&["a", "b", "a"]), 5);
        let rendered: Vec<String> = summary.iter().map(|e| e.to_string()).collect();
        assert_eq!(rendered, vec!["Row 2: a", "Row 3: b", "Row 4: a"]);
    }

    #[test]
    fn test_above_ceiling_is_counted() {
        let summary = summarize(entries(&["a", "b", "a", "a", "c", "b"]), 5);
        let rendered: Vec<String> = summary.iter().map(|e| e.to_string()).collect();
        assert_eq!(rendered, vec!["a: 3 cases", "b: 2 cases", "c: 1 cases"]);
    }

    #[test]
    fn test_collapse_is_idempotent() {
        let once = collapse(&entries(&["a", "b", "a", "c", "a", "b", "d"]));
        let twice = collapse(&once);
        assert_eq!(once, twice);

        let summarized = summarize(entries(&["x", "y", "x", "x", "y", "z"]), 5);
        assert_eq!(summarize(summarized.clone(), 5), summarized);
    }

    #[test]
    fn test_entries_from_rows_keeps_row_order() {
        let rows = vec![
            RowOutcome::new(0, vec!["first".to_string(), "second".to_string()]),
            RowOutcome::new(1, Vec::new()),
            RowOutcome::new(2, vec!["third".to_string()]),
        ];
        let flattened = entries_from_rows(&rows);

        assert_eq!(flattened.len(), 3);
        assert_eq!(flattened[0].line, Some(2));
        assert_eq!(flattened[2].line, Some(4));
        assert_eq!(flattened[2].message, "third");
    }
}
