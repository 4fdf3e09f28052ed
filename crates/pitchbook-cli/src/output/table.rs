use serde_json::Value;
use std::fmt::Write;
use tabled::{builder::Builder, Table};

use super::{cell, headers, result_of, row_cells, row_fields, scalar_fields};

/// Field/value table for the scalar results, one table per row set, then
/// warnings and methodology from the envelope.
pub fn render_table(value: &Value) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let result = result_of(value);

    match result {
        Value::Object(map) => {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            for (key, val) in scalar_fields(map) {
                builder.push_record([key.clone(), cell(val)]);
            }
            writeln!(out, "{}", Table::from(builder))?;

            for (key, rows) in row_fields(map) {
                writeln!(out, "\n{key}:")?;
                writeln!(out, "{}", rows_table(rows))?;
            }
        }
        Value::Array(rows) if !rows.is_empty() => writeln!(out, "{}", rows_table(rows))?,
        Value::Array(_) => writeln!(out, "(empty)")?,
        other => writeln!(out, "{}", cell(other))?,
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            writeln!(out, "\nWarnings:")?;
            for w in warnings.iter().filter_map(Value::as_str) {
                writeln!(out, "  - {w}")?;
            }
        }
    }
    if let Some(Value::String(methodology)) = value.get("methodology") {
        writeln!(out, "\nMethodology: {methodology}")?;
    }

    Ok(out)
}

fn rows_table(rows: &[Value]) -> Table {
    let headers = headers(rows);
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for row in rows {
        builder.push_record(row_cells(row, &headers));
    }
    Table::from(builder)
}
