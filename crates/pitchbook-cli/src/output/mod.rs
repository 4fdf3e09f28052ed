pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Render `value` in the requested format and print it to stdout.
pub fn format_output(format: &OutputFormat, value: &Value) {
    let rendered: Result<String, Box<dyn std::error::Error>> = match format {
        OutputFormat::Json => json::render_json(value).map_err(Into::into),
        OutputFormat::Table => table::render_table(value).map_err(Into::into),
        OutputFormat::Csv => csv_out::render_csv(value),
        OutputFormat::Minimal => Ok(minimal::render_minimal(value)),
    };
    match rendered {
        Ok(text) => print!("{text}"),
        Err(e) => eprintln!("output error: {e}"),
    }
}

/// The `result` object of an envelope, or the value itself.
pub(crate) fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Scalar fields of an object, skipping nested rows.
pub(crate) fn scalar_fields(map: &Map<String, Value>) -> impl Iterator<Item = (&String, &Value)> {
    map.iter().filter(|(_, v)| as_rows(v).is_none())
}

/// Arrays of objects (projection years, multiples, peers) rendered as their own tables.
pub(crate) fn row_fields(map: &Map<String, Value>) -> impl Iterator<Item = (&String, &[Value])> {
    map.iter().filter_map(|(k, v)| as_rows(v).map(|rows| (k, rows)))
}

fn as_rows(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) if items.first().is_some_and(Value::is_object) => Some(items),
        _ => None,
    }
}

/// Plain text for one cell.
pub(crate) fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Column headers taken from the first row.
pub(crate) fn headers(rows: &[Value]) -> Vec<String> {
    rows.first()
        .and_then(Value::as_object)
        .map(|first| first.keys().cloned().collect())
        .unwrap_or_default()
}

pub(crate) fn row_cells(row: &Value, headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|h| row.get(h.as_str()).map(cell).unwrap_or_default())
        .collect()
}
