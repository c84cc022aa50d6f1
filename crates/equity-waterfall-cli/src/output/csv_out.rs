use serde_json::{Map, Value};
use std::io;

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) if result.contains_key("annual_rows") => {
                write_waterfall_csv(&mut wtr, result);
            }
            Some(Value::Object(result)) if result.contains_key("matrix") => {
                write_matrix_csv(&mut wtr, result);
            }
            Some(Value::Object(result)) => match result.get("partners") {
                Some(Value::Array(partners)) => write_array_csv(&mut wtr, partners),
                _ => write_fields(&mut wtr, result),
            },
            _ => write_fields(&mut wtr, map),
        },
        Value::Array(arr) => {
            write_array_csv(&mut wtr, arr);
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

/// One row per period: index, owner flow, then each partner's flow.
fn write_waterfall_csv(wtr: &mut StdoutWriter<'_>, result: &Map<String, Value>) {
    let ids: Vec<String> = result
        .get("partners")
        .and_then(Value::as_array)
        .map(|ps| {
            ps.iter()
                .filter_map(|p| p.get("partner_id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut header = vec!["period".to_string(), "owner_cash_flow".to_string()];
    header.extend(ids.iter().cloned());
    let _ = wtr.write_record(&header);

    if let Some(Value::Array(rows)) = result.get("annual_rows") {
        for row in rows {
            let mut record = vec![
                row.get("year_index").map(format_csv_value).unwrap_or_default(),
                row.get("owner_cash_flow").map(format_csv_value).unwrap_or_default(),
            ];
            for id in &ids {
                record.push(
                    row.get("partner_distributions")
                        .and_then(|d| d.get(id.as_str()))
                        .map(format_csv_value)
                        .unwrap_or_default(),
                );
            }
            let _ = wtr.write_record(&record);
        }
    }
}

fn write_matrix_csv(wtr: &mut StdoutWriter<'_>, result: &Map<String, Value>) {
    let cols: Vec<String> = result
        .get("variable_2_values")
        .and_then(Value::as_array)
        .map(|vs| vs.iter().map(format_csv_value).collect())
        .unwrap_or_default();
    let mut header = vec![String::new()];
    header.extend(cols);
    let _ = wtr.write_record(&header);

    let rows = result.get("variable_1_values").and_then(Value::as_array);
    let matrix = result.get("matrix").and_then(Value::as_array);
    if let (Some(rows), Some(matrix)) = (rows, matrix) {
        for (row_value, cells) in rows.iter().zip(matrix) {
            let mut record = vec![format_csv_value(row_value)];
            if let Value::Array(cells) = cells {
                record.extend(cells.iter().map(format_csv_value));
            }
            let _ = wtr.write_record(&record);
        }
    }
}

fn write_fields(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_array_csv(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
