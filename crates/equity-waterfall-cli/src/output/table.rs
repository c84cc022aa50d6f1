use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) if res_map.contains_key("annual_rows") => {
            print_waterfall(res_map);
        }
        Value::Object(res_map) if res_map.contains_key("matrix") => {
            print_sensitivity_grid(res_map);
        }
        Value::Object(res_map) => {
            if let Some(Value::Array(partners)) = res_map.get("partners") {
                print_array_table(partners);
            } else {
                print_flat_object(result);
            }
        }
        _ => print_flat_object(&Value::Object(envelope.clone())),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Period grid (owner flow plus one column per partner) followed by a
/// per-partner summary.
fn print_waterfall(result: &Map<String, Value>) {
    let partners = result
        .get("partners")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let ids: Vec<String> = partners
        .iter()
        .filter_map(|p| p.get("partner_id").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    let mut grid = Builder::default();
    let mut header = vec!["Period".to_string(), "Owner".to_string()];
    header.extend(ids.iter().cloned());
    header.push("Gap".to_string());
    grid.push_record(header);

    if let Some(Value::Array(rows)) = result.get("annual_rows") {
        for row in rows {
            let mut record = vec![
                row.get("year_index").map(format_value).unwrap_or_default(),
                row.get("owner_cash_flow").map(format_value).unwrap_or_default(),
            ];
            for id in &ids {
                record.push(
                    row.get("partner_distributions")
                        .and_then(|d| d.get(id.as_str()))
                        .map(format_value)
                        .unwrap_or_default(),
                );
            }
            record.push(row.get("conservation_gap").map(format_value).unwrap_or_default());
            grid.push_record(record);
        }
    }
    println!("{}", Table::from(grid));

    let mut summary = Builder::default();
    summary.push_record(["Partner", "Contributed", "Distributed", "IRR", "MOIC"]);
    for p in &partners {
        summary.push_record(
            ["partner_id", "total_contributed", "total_distributed", "irr", "moic"]
                .map(|k| p.get(k).map(format_value).unwrap_or_default()),
        );
    }
    println!("\n{}", Table::from(summary));

    if let Some(Value::Array(clawbacks)) = result.get("clawbacks") {
        if !clawbacks.is_empty() {
            println!("\nClawbacks:");
            print_array_table(clawbacks);
        }
    }
}

fn print_sensitivity_grid(result: &Map<String, Value>) {
    let cols = result
        .get("variable_2_values")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let rows = result
        .get("variable_1_values")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let corner = format!(
        "{} \\ {}",
        result.get("variable_1_name").map(format_value).unwrap_or_default(),
        result.get("variable_2_name").map(format_value).unwrap_or_default()
    );

    let mut builder = Builder::default();
    let mut header = vec![corner];
    header.extend(cols.iter().map(format_value));
    builder.push_record(header);

    let matrix = result.get("matrix").and_then(Value::as_array);
    for (i, row_value) in rows.iter().enumerate() {
        let mut record = vec![format_value(row_value)];
        if let Some(Value::Array(cells)) = matrix.and_then(|m| m.get(i)) {
            record.extend(cells.iter().map(|c| match c {
                Value::Null => "n/a".to_string(),
                other => format_value(other),
            }));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));

    if let Some(base) = result.get("base_case_value") {
        println!("\nBase case: {}", format_value(base));
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        let table = Table::from(builder);
        println!("{}", table);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
