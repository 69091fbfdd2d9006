//! Display formatting for terminal output
//!
//! Renders rows as an aligned text table, or as JSON or YAML for scripting.

use clap::ValueEnum;
use serde_json::Value;

use crate::error::{UndestroyError, UndestroyResult};
use crate::models::{display_key, Record};

/// Output format for row listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => display_key(other),
    }
}

/// Format rows as a table with one column per entry in `columns`
pub fn format_records(records: &[Record], columns: &[String]) -> String {
    if records.is_empty() {
        return "No rows found.".to_string();
    }

    // Calculate column widths
    let widths: Vec<usize> = columns
        .iter()
        .map(|column| {
            records
                .iter()
                .map(|r| cell(&r.value(column)).len())
                .max()
                .unwrap_or(0)
                .max(column.len())
        })
        .collect();

    let mut output = String::new();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{:<width$}", column, width = width))
        .collect();
    output.push_str(header.join("  ").trim_end());
    output.push('\n');

    let separator: Vec<String> = widths
        .iter()
        .map(|width| format!("{:-<width$}", "", width = width))
        .collect();
    output.push_str(&separator.join("  "));
    output.push('\n');

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| format!("{:<width$}", cell(&record.value(column)), width = width))
            .collect();
        output.push_str(row.join("  ").trim_end());
        output.push('\n');
    }

    output.push_str(&format!("\n{} row(s)\n", records.len()));
    output
}

/// Render rows in the requested format
pub fn render(records: &[Record], columns: &[String], format: OutputFormat) -> UndestroyResult<String> {
    match format {
        OutputFormat::Table => Ok(format_records(records, columns)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(records).map_err(|e| UndestroyError::Export(e.to_string()))
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(records).map_err(|e| UndestroyError::Export(e.to_string()))
        }
    }
}
