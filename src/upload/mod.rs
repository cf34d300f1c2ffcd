//! Spreadsheet-to-text conversion for context data.
//!
//! Uploaded workbooks become a bounded, human-readable text block that the
//! prompt compiler treats as opaque appended text. Only a preview of each
//! sheet is rendered; anything past the cap is summarized with a truncation
//! notice.

use anyhow::{Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::Serialize;
use std::io::Cursor;

/// Rows rendered per sheet before truncating
const PREVIEW_ROWS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct SheetSummary {
    pub name: String,
    #[serde(rename = "rowCount")]
    pub row_count: usize,
    pub columns: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ParsedWorkbook {
    pub sheets: Vec<SheetSummary>,
    #[serde(rename = "formattedContext")]
    pub formatted_context: String,
}

/// Parse workbook bytes (.xlsx/.xls) and render the context block.
pub fn parse_workbook(bytes: Vec<u8>) -> Result<ParsedWorkbook> {
    let cursor = Cursor::new(bytes);
    let mut workbook =
        open_workbook_auto_from_rs(cursor).context("Failed to parse spreadsheet")?;

    let mut sheets = Vec::new();
    let mut context = String::from("=== UPLOADED DATA CONTEXT ===\n\n");

    let sheet_names = workbook.sheet_names().to_owned();
    for name in sheet_names {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(_) => continue,
        };

        let mut rows = range.rows();
        let columns: Vec<String> = rows
            .next()
            .map(|header| header.iter().map(cell_to_string).collect())
            .unwrap_or_default();

        let records: Vec<Vec<String>> = rows
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        context.push_str(&format!("## {} DATA\n", name.to_uppercase()));
        context.push_str(&format!("Columns: {}\n", columns.join(", ")));
        context.push_str(&format!("Total Records: {}\n\n", records.len()));

        for record in records.iter().take(PREVIEW_ROWS) {
            let row_str = columns
                .iter()
                .zip(record.iter())
                .map(|(key, value)| format!("{key}: {value}"))
                .collect::<Vec<_>>()
                .join(" | ");
            context.push_str(&format!("- {row_str}\n"));
        }

        if records.len() > PREVIEW_ROWS {
            context.push_str(&format!("... and {} more records\n", records.len() - PREVIEW_ROWS));
        }
        context.push('\n');

        sheets.push(SheetSummary { name, row_count: records.len(), columns });
    }

    Ok(ParsedWorkbook { formatted_context: context.trim().to_string(), sheets })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{e:?}"),
    }
}

/// Validate the uploaded file name looks like a spreadsheet.
pub fn is_spreadsheet_filename(name: &str) -> bool {
    let lowered = name.to_lowercase();
    lowered.ends_with(".xlsx") || lowered.ends_with(".xls")
}
