use serde_json::Value;

/// Print just the key answer from the output.
///
/// Waterfall and simulation results print one `partner_id irr moic` line per
/// partner; otherwise the first well-known field wins.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = ["irr", "base_case_value", "moic", "npv_at_irr"];

    if let Value::Object(map) = result_obj {
        if let Some(Value::Array(partners)) = map.get("partners") {
            for p in partners {
                println!(
                    "{} {} {}",
                    p.get("partner_id").map(format_minimal).unwrap_or_default(),
                    p.get("irr").map(format_minimal).unwrap_or_default(),
                    p.get("moic").map(format_minimal).unwrap_or_default(),
                );
            }
            return;
        }

        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Object(map) => map
            .get("mean")
            .map(format_minimal)
            .unwrap_or_else(|| serde_json::to_string(value).unwrap_or_default()),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
