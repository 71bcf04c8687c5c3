use serde_json::Value;

use super::cell;

/// Print just the headline value of a result.
///
/// Known headline fields are tried in order (descending into an analysis'
/// `optimization`); a projection prints its final balance.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    println!("{}", headline(result_obj));
}

fn headline(value: &Value) -> String {
    let priority_keys = [
        "minimum_reserve",
        "trend_direction",
        "cumulative_cash",
        "default_horizon_days",
    ];

    match value {
        Value::Object(map) => {
            for key in &priority_keys {
                if let Some(val) = map.get(*key).filter(|v| !v.is_null()) {
                    return cell(val);
                }
            }
            for nested in ["optimization", "trends"] {
                if let Some(inner) = map.get(nested) {
                    return headline(inner);
                }
            }
            match map.iter().next() {
                Some((key, val)) => format!("{}: {}", key, cell(val)),
                None => String::new(),
            }
        }
        Value::Array(arr) => arr.last().map(headline).unwrap_or_default(),
        _ => cell(value),
    }
}
