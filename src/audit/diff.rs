//! Change summaries for audit logging
//!
//! Compares the JSON form of an entity before and after a mutation and
//! describes what changed, one `field: old -> new` clause per change.

use serde_json::{Map, Value};

/// Fields that change on every write and carry no information for a reader
const IGNORED_FIELDS: &[&str] = &["updated_at"];

/// Objects whose keys are data (month keys) rather than schema
const KEYED_FIELDS: &[&str] = &["month_overrides"];

/// Describe the differences between two entity states
///
/// Returns `None` when nothing besides bookkeeping timestamps changed.
pub fn summarize_changes(before: &Value, after: &Value) -> Option<String> {
    let mut changes = Vec::new();

    match (before, after) {
        (Value::Object(b), Value::Object(a)) => diff_objects(b, a, "", &mut changes),
        _ if before != after => changes.push(format!(
            "{} -> {}",
            format_value(before),
            format_value(after)
        )),
        _ => {}
    }

    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

fn diff_objects(
    before: &Map<String, Value>,
    after: &Map<String, Value>,
    prefix: &str,
    changes: &mut Vec<String>,
) {
    for (key, before_val) in before {
        if prefix.is_empty() && IGNORED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let field = field_path(prefix, key);

        match after.get(key) {
            Some(after_val) if after_val == before_val => {}
            Some(Value::Object(a)) if prefix.is_empty() && KEYED_FIELDS.contains(&key.as_str()) => {
                match before_val {
                    Value::Object(b) => diff_objects(b, a, &field, changes),
                    _ => changes.push(format!(
                        "{}: {} -> {}",
                        field,
                        format_value(before_val),
                        format_value(&Value::Object(a.clone()))
                    )),
                }
            }
            Some(after_val) => changes.push(format!(
                "{}: {} -> {}",
                field,
                format_value(before_val),
                format_value(after_val)
            )),
            None => changes.push(format!("{}: {} -> (removed)", field, format_value(before_val))),
        }
    }

    for (key, after_val) in after {
        if before.contains_key(key) {
            continue;
        }
        if prefix.is_empty() && IGNORED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        changes.push(format!(
            "{}: (added) -> {}",
            field_path(prefix, key),
            format_value(after_val)
        ));
    }
}

fn field_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Format a JSON value for human-readable display
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.chars().count() > 50 => {
            let head: String = s.chars().take(47).collect();
            format!("\"{}...\"", head)
        }
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) if obj.len() == 1 => {
            // Single-key objects are enum variants such as {"override": {...}}
            obj.keys().next().cloned().unwrap_or_default()
        }
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}
