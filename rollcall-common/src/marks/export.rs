//! Spreadsheet export
//!
//! [`SheetWriter`] turns cleaned rows into a downloadable file. The bundled
//! writer emits CSV, which every spreadsheet application opens.

use chrono::NaiveDate;

use super::sheet::{MarkEntryInput, UNKNOWN_NAME};
use super::MAX_MARK;
use crate::{Error, Result};

/// Default subject when neither the row nor the request names one
pub const DEFAULT_EXPORT_SUBJECT: &str = "Marks";

pub const EXPORT_HEADER: [&str; 4] = ["Student Name", "Marks", "Subject", "Date"];

/// One exported row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub name: String,
    pub mark: u32,
    pub subject: String,
    pub date: NaiveDate,
}

/// Clean client entries into export rows
///
/// Blank names, "Unknown" and out-of-range marks are dropped. A row's own
/// subject wins over the request subject.
pub fn export_rows(inputs: &[MarkEntryInput], subject: Option<&str>, date: NaiveDate) -> Result<Vec<ExportRow>> {
    if inputs.is_empty() {
        return Err(Error::Validation("Mark entries are required".to_string()));
    }
    let fallback = subject
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_EXPORT_SUBJECT);

    let rows: Vec<ExportRow> = inputs
        .iter()
        .filter_map(|input| {
            let name = input.clean_name();
            let mark = input.mark_value();
            if name.is_empty() || name == UNKNOWN_NAME || !(0..=MAX_MARK as i64).contains(&mark) {
                return None;
            }
            let subject = input
                .subject
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback);
            Some(ExportRow {
                name,
                mark: mark as u32,
                subject: subject.to_string(),
                date,
            })
        })
        .collect();

    if rows.is_empty() {
        return Err(Error::Validation("No valid entries to generate Excel".to_string()));
    }
    Ok(rows)
}

/// Serializes export rows into a file
pub trait SheetWriter: Send + Sync {
    /// MIME type of the produced file
    fn content_type(&self) -> &'static str;

    /// File extension without the dot
    fn extension(&self) -> &'static str;

    fn write(&self, rows: &[ExportRow]) -> Result<Vec<u8>>;
}

/// Comma-separated values, RFC 4180 quoting
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSheetWriter;

impl SheetWriter for CsvSheetWriter {
    fn content_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write(&self, rows: &[ExportRow]) -> Result<Vec<u8>> {
        let mut out = String::new();
        push_record(&mut out, EXPORT_HEADER.iter().map(|s| s.to_string()));
        for row in rows {
            push_record(
                &mut out,
                [
                    row.name.clone(),
                    row.mark.to_string(),
                    row.subject.clone(),
                    row.date.format("%Y-%m-%d").to_string(),
                ],
            );
        }
        Ok(out.into_bytes())
    }
}

fn push_record(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let line: Vec<String> = fields.into_iter().map(|f| quote_field(&f)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
