//! Normalized request input: query, form and cookie parameters, or the body.

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

/// What `inputs()` found, in order of precedence.
#[derive(Clone, Debug, PartialEq)]
pub enum Inputs {
    /// Query, form and cookie parameters merged (later sources override earlier keys).
    Params(Map<String, Value>),
    /// Decoded JSON body of a JSON request. `Null` when the body did not parse.
    Json(Value),
    /// Raw body text.
    Raw(String),
}

impl Inputs {
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Inputs::Params(map) => map.get(key),
            Inputs::Json(Value::Object(map)) => map.get(key),
            Inputs::Json(_) | Inputs::Raw(_) => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Inputs::Params(map) => Value::Object(map),
            Inputs::Json(v) => v,
            Inputs::Raw(s) => Value::String(s),
        }
    }
}

/// Parse `a=1&b[]=2&b[]=3` pairs. Keys ending in `[]` collect into an array; a repeated
/// plain key keeps its last value.
pub(crate) fn parse_params(encoded: &str) -> Map<String, Value> {
    let pairs: Vec<(String, String)> = match serde_urlencoded::from_str(encoded) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed url-encoded input");
            return Map::new();
        }
    };
    let mut out = Map::new();
    for (key, value) in pairs {
        if let Some(base) = key.strip_suffix("[]") {
            match out.get_mut(base) {
                Some(Value::Array(items)) => items.push(Value::String(value)),
                _ => {
                    out.insert(base.to_string(), Value::Array(vec![Value::String(value)]));
                }
            }
        } else {
            out.insert(key, Value::String(value));
        }
    }
    out
}

/// Parse one or more `Cookie` header values (`a=1; b=2`). Each pair splits at its first
/// `=`; only the value is percent-decoded, and `+` stays literal.
pub(crate) fn parse_cookies<'a, I>(headers: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = Map::new();
    for header in headers {
        for pair in header.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim().trim_matches('"');
            let decoded = percent_decode_str(value).decode_utf8_lossy().into_owned();
            out.insert(name.to_string(), Value::String(decoded));
        }
    }
    out
}
