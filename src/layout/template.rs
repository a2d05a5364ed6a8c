use serde_json::Value;

use super::LayoutError;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Placeholder(Vec<String>),
}

/// A row template with `{{ dotted.path }}` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn compile(source: &str) -> Result<Self, LayoutError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| LayoutError::Template(format!("unclosed placeholder in {:?}", source)))?;

            let path = after[..end].trim();
            if path.is_empty() {
                return Err(LayoutError::Template(format!("empty placeholder in {:?}", source)));
            }
            segments.push(Segment::Placeholder(path.split('.').map(str::to_string).collect()));
            rest = &after[end + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Render with `scopes` searched front to back for every placeholder.
    pub fn render(&self, scopes: &[&Value]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(path) => {
                    let value = scopes.iter().find_map(|scope| lookup(scope, path));
                    if let Some(value) = value {
                        out.push_str(&html_escape(&display_value(value)));
                    }
                }
            }
        }
        out
    }
}

pub(crate) fn lookup<'a>(scope: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = scope;
    for key in path {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Null => None,
        other => Some(other),
    }
}

/// Text form of a metadata value; objects render as nothing.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::Null | Value::Object(_) => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

pub fn html_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
