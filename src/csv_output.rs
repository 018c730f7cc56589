//! CSV output format for hook reports

use crate::report::ReportRow;

const HEADER: &str = "hook,type,execution_ms,slow,caller";

/// CSV output formatter
#[derive(Debug)]
pub struct CsvOutput {
    rows: Vec<ReportRow>,
}

impl CsvOutput {
    pub fn new(rows: Vec<ReportRow>) -> Self {
        Self { rows }
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_row(row: &ReportRow) -> String {
        [
            Self::escape_field(&row.hook),
            row.kind.clone(),
            format!("{:.2}", row.display_ms),
            row.is_slow.to_string(),
            Self::escape_field(&row.caller),
        ]
        .join(",")
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(HEADER);
        output.push('\n');
        for row in &self.rows {
            output.push_str(&Self::format_row(row));
            output.push('\n');
        }
        output
    }
}
