//! View templates: plain text with `{{ name }}` interpolation.
//!
//! Names resolve against one scope map; dotted segments walk into objects
//! (`{{ post.title }}`) and arrays (`{{ tags.0 }}`). Values are written as-is, so
//! anything that needs escaping must be escaped before it reaches the scope.

mod escape;

pub use escape::{escape_html, escape_value};

use crate::error::RenderError;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::OnceLock;

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\s*\}\}")
            .expect("tag pattern is valid")
    })
}

#[derive(Clone, Debug, PartialEq)]
enum Part {
    Text(String),
    Name(String),
}

/// A parsed template.
#[derive(Clone, Debug)]
pub struct Template {
    path: String,
    parts: Vec<Part>,
}

impl Template {
    /// Parse `source`; `path` is only used in error messages.
    pub fn parse(path: &str, source: &str) -> Result<Self, RenderError> {
        let mut parts = Vec::new();
        let mut last = 0;
        for caps in tag_pattern().captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_text(&mut parts, path, &source[last..whole.start()], last)?;
            parts.push(Part::Name(name.as_str().to_string()));
            last = whole.end();
        }
        push_text(&mut parts, path, &source[last..], last)?;
        Ok(Template {
            path: path.to_string(),
            parts,
        })
    }

    /// Render against `scope`. Any undefined name fails the whole render.
    pub fn render(&self, scope: &Map<String, Value>) -> Result<String, RenderError> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(t) => out.push_str(t),
                Part::Name(name) => {
                    let value = lookup(scope, name).ok_or_else(|| RenderError::Undefined {
                        path: self.path.clone(),
                        name: name.clone(),
                    })?;
                    write_value(&mut out, value);
                }
            }
        }
        Ok(out)
    }
}

/// Text between tags must not contain a stray `{{`.
fn push_text(parts: &mut Vec<Part>, path: &str, text: &str, offset: usize) -> Result<(), RenderError> {
    if let Some(at) = text.find("{{") {
        return Err(RenderError::Malformed {
            path: path.to_string(),
            offset: offset + at,
        });
    }
    if !text.is_empty() {
        parts.push(Part::Text(text.to_string()));
    }
    Ok(())
}

fn lookup<'a>(scope: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    let mut segments = name.split('.');
    let mut current = scope.get(segments.next()?)?;
    for seg in segments {
        current = match current {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "1" } else { "" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        other => out.push_str(&other.to_string()),
    }
}

/// Build a render scope: `data` escaped, then `raw` as given. Raw keys win on clash.
pub fn scope(data: &Value, raw: &Value) -> Result<Map<String, Value>, RenderError> {
    let mut scope = Map::new();
    if let Value::Object(map) = escape_value(as_object(data)?) {
        scope.extend(map);
    }
    if let Value::Object(map) = as_object(raw)? {
        scope.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    Ok(scope)
}

fn as_object(v: &Value) -> Result<&Value, RenderError> {
    static EMPTY: OnceLock<Value> = OnceLock::new();
    match v {
        Value::Object(_) => Ok(v),
        Value::Null => Ok(EMPTY.get_or_init(|| Value::Object(Map::new()))),
        other => Err(RenderError::Context(type_name(other))),
    }
}

pub(crate) fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read, parse and render one template file. Nothing is returned unless the whole file renders.
pub async fn render_file(file: &Path, data: &Value, raw: &Value) -> Result<String, RenderError> {
    let path = file.display().to_string();
    let source = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
    let template = Template::parse(&path, &source)?;
    let output = template.render(&scope(data, raw)?);
    if let Err(e) = &output {
        tracing::warn!(view = %path, error = %e, "render failed");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(source: &str, data: Value, raw: Value) -> Result<String, RenderError> {
        Template::parse("test.html", source)?.render(&scope(&data, &raw)?)
    }

    #[test]
    fn interpolates_escaped_and_raw() {
        let out = render(
            "<h1>{{ title }}</h1>{{body}}",
            json!({"title": "<Tom & Jerry>"}),
            json!({"body": "<p>trusted</p>"}),
        )
        .unwrap();
        assert_eq!(out, "<h1>&lt;Tom &amp; Jerry&gt;</h1><p>trusted</p>");
    }

    #[test]
    fn raw_wins_on_clash() {
        let out = render("{{ x }}", json!({"x": "<a>"}), json!({"x": "<b>"})).unwrap();
        assert_eq!(out, "<b>");
    }

    #[test]
    fn dotted_paths_walk_objects_and_arrays() {
        let out = render(
            "{{ post.title }} {{ post.tags.1 }} {{ n }}{{ missing_ok }}",
            json!({"post": {"title": "T", "tags": ["a", "b"]}, "n": 3, "missing_ok": null}),
            Value::Null,
        )
        .unwrap();
        assert_eq!(out, "T b 3");
    }

    #[test]
    fn undefined_name_fails_without_output() {
        let err = render("before {{ nope }} after", json!({}), json!({})).unwrap_err();
        assert!(matches!(err, RenderError::Undefined { ref name, .. } if name == "nope"));
    }

    #[test]
    fn stray_open_tag_is_malformed() {
        let err = Template::parse("t.html", "ok {{ not closed").unwrap_err();
        assert!(matches!(err, RenderError::Malformed { offset: 3, .. }));
    }

    #[test]
    fn data_must_be_an_object() {
        let err = scope(&json!(["a"]), &Value::Null).unwrap_err();
        assert!(matches!(err, RenderError::Context("array")));
    }
}
