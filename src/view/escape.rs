//! HTML escaping for values interpolated into views.

use serde_json::Value;

/// Escape `&`, `<`, `>`, `"` and `'` for safe inclusion in HTML text or attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape every string leaf; arrays and objects keep their shape, other scalars are unchanged.
pub fn escape_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_html(s)),
        Value::Array(items) => Value::Array(items.iter().map(escape_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), escape_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
