use serde_json::Value;

use super::{cell, headers, result_of, row_cells, row_fields, scalar_fields};

/// CSV of the first row set in the result (projection years, multiples),
/// or a two-column `field,value` listing when the result has none.
pub fn render_csv(value: &Value) -> Result<String, Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    let result = result_of(value);

    match result {
        Value::Object(map) => match row_fields(map).next() {
            Some((_, rows)) => write_rows(&mut wtr, rows)?,
            None => {
                wtr.write_record(["field", "value"])?;
                for (key, val) in scalar_fields(map) {
                    wtr.write_record([key.as_str(), &cell(val)])?;
                }
            }
        },
        Value::Array(rows) => write_rows(&mut wtr, rows)?,
        other => wtr.write_record([cell(other)])?,
    }

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn write_rows(
    wtr: &mut csv::Writer<Vec<u8>>,
    rows: &[Value],
) -> Result<(), Box<dyn std::error::Error>> {
    let headers = headers(rows);
    if headers.is_empty() {
        for item in rows {
            wtr.write_record([cell(item)])?;
        }
        return Ok(());
    }
    wtr.write_record(&headers)?;
    for row in rows {
        wtr.write_record(row_cells(row, &headers))?;
    }
    Ok(())
}
