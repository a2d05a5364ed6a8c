use std::str::FromStr;

use serde_json::{json, Value};

use super::template::{display_value, html_escape, lookup, Template};
use super::{LayoutError, RenderOptions};
use crate::config::RowConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowType {
    Simple,
    MapCoordinates,
    Tags,
    Date,
}

impl RowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowType::Simple => "simple",
            RowType::MapCoordinates => "map-coordinates",
            RowType::Tags => "tags",
            RowType::Date => "date",
        }
    }

    fn default_field(&self) -> Option<&'static str> {
        match self {
            RowType::Simple => None,
            RowType::MapCoordinates => None,
            RowType::Tags => Some("tags"),
            RowType::Date => Some("creation_time"),
        }
    }
}

impl FromStr for RowType {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(RowType::Simple),
            "map-coordinates" => Ok(RowType::MapCoordinates),
            "tags" => Ok(RowType::Tags),
            "date" => Ok(RowType::Date),
            other => Err(LayoutError::UnknownRowType(other.to_string())),
        }
    }
}

/// A compiled layout row.
#[derive(Debug, Clone)]
pub struct Row {
    pub title: String,
    pub row_type: RowType,
    template: Option<Template>,
    field: Option<Vec<String>>,
}

impl Row {
    pub fn compile(config: &RowConfig) -> Result<Self, LayoutError> {
        let row_type = match config.row_type.as_deref() {
            None | Some("") => RowType::Simple,
            Some(name) => name.parse()?,
        };

        let template = config
            .template
            .as_deref()
            .map(Template::compile)
            .transpose()?;

        let field = config
            .field
            .as_deref()
            .or(row_type.default_field())
            .map(|f| f.split('.').map(str::to_string).collect());

        Ok(Self {
            title: config.title.clone(),
            row_type,
            template,
            field,
        })
    }

    /// Locals follow the precedence metadata < options < helpers.
    fn render_template(&self, options: &Value, metadata: &Value, helpers: &Value) -> Option<String> {
        self.template
            .as_ref()
            .map(|template| template.render(&[helpers, options, metadata]))
    }

    fn field_value<'a>(&self, metadata: &'a Value) -> Option<&'a Value> {
        self.field.as_ref().and_then(|path| lookup(metadata, path))
    }

    pub fn render(&self, options: &RenderOptions, metadata: &Value, helpers: &Value) -> String {
        let options_value = options.to_value();
        let body = match self.row_type {
            RowType::Simple => self
                .render_template(&options_value, metadata, helpers)
                .unwrap_or_else(|| {
                    self.field_value(metadata)
                        .map(|v| html_escape(&display_value(v)))
                        .unwrap_or_default()
                }),
            RowType::Tags => {
                let items: Vec<String> = match self.field_value(metadata) {
                    Some(Value::Array(tags)) => tags
                        .iter()
                        .map(display_value)
                        .filter(|t| !t.is_empty())
                        .map(|t| format!("<li>{}</li>", html_escape(&t)))
                        .collect(),
                    Some(other) => vec![format!("<li>{}</li>", html_escape(&display_value(other)))],
                    None => Vec::new(),
                };
                if items.is_empty() {
                    String::new()
                } else {
                    format!("<ul class=\"tags\">{}</ul>", items.concat())
                }
            }
            RowType::Date => self
                .field_value(metadata)
                .and_then(|value| {
                    crate::sitemap::format_lastmod(value)
                        .map(|iso| iso[..10].to_string())
                        .or_else(|| Some(display_value(value)))
                })
                .map(|date| html_escape(&date))
                .unwrap_or_default(),
            RowType::MapCoordinates => match coordinates(metadata, self.field.as_deref()) {
                Some((lat, lng)) => format!(
                    "<div class=\"map\" data-latitude=\"{}\" data-longitude=\"{}\"></div>",
                    lat, lng
                ),
                None if options.show_call_to_action => {
                    "<a class=\"call-to-action\" data-action=\"geo-tagging:start\">Hjælp med at placere billedet</a>"
                        .to_string()
                }
                None => String::new(),
            },
        };

        format!(
            "<div class=\"row row--{}\"><div class=\"row__title\">{}</div><div class=\"row__value\">{}</div></div>",
            self.row_type.as_str(),
            html_escape(&self.title),
            body
        )
    }

    /// A row has a value when the metadata changes its rendering.
    pub fn has_value(&self, options: &RenderOptions, metadata: &Value, helpers: &Value) -> bool {
        if options.show_call_to_action && self.row_type == RowType::MapCoordinates {
            return true;
        }
        self.render(options, metadata, helpers) != self.render(options, &json!({}), helpers)
    }
}

/// `latitude`/`longitude` from the row's field object, or the document root.
fn coordinates(metadata: &Value, field: Option<&[String]>) -> Option<(f64, f64)> {
    let scope = match field {
        Some(path) => lookup(metadata, path)?,
        None => metadata,
    };
    let lat = scope.get("latitude").and_then(Value::as_f64)?;
    let lng = scope.get("longitude").and_then(Value::as_f64)?;
    Some((lat, lng))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(title: &str, row_type: Option<&str>, template: Option<&str>, field: Option<&str>) -> Row {
        Row::compile(&RowConfig {
            title: title.to_string(),
            row_type: row_type.map(str::to_string),
            template: template.map(str::to_string),
            field: field.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn test_default_type_is_simple() {
        assert_eq!(row("Titel", None, Some("{{ short_title }}"), None).row_type, RowType::Simple);
    }

    #[test]
    fn test_unknown_row_type() {
        let err = Row::compile(&RowConfig {
            title: "x".to_string(),
            row_type: Some("hologram".to_string()),
            ..RowConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, LayoutError::UnknownRowType(name) if name == "hologram"));
    }

    #[test]
    fn test_simple_row_has_value() {
        let r = row("Titel", None, Some("{{ short_title }}"), None);
        let options = RenderOptions::default();
        let helpers = json!({});
        assert!(r.has_value(&options, &json!({ "short_title": "Nyhavn" }), &helpers));
        assert!(!r.has_value(&options, &json!({ "other": 1 }), &helpers));
        assert!(r
            .render(&options, &json!({ "short_title": "Nyhavn" }), &helpers)
            .contains("<div class=\"row__value\">Nyhavn</div>"));
    }

    #[test]
    fn test_helper_only_template_has_no_value() {
        let r = row("Site", None, Some("{{ site_title }}"), None);
        let helpers = json!({ "site_title": "KBH" });
        assert!(!r.has_value(&RenderOptions::default(), &json!({ "short_title": "x" }), &helpers));
    }

    #[test]
    fn test_map_coordinates_call_to_action() {
        let r = row("Placering", Some("map-coordinates"), None, None);
        let helpers = json!({});
        let cta = RenderOptions {
            show_call_to_action: true,
        };
        assert!(r.has_value(&cta, &json!({}), &helpers));
        assert!(!r.has_value(&RenderOptions::default(), &json!({}), &helpers));

        let with_coords = json!({ "latitude": 55.68, "longitude": 12.59 });
        assert!(r.has_value(&RenderOptions::default(), &with_coords, &helpers));
        assert!(r
            .render(&RenderOptions::default(), &with_coords, &helpers)
            .contains("data-latitude=\"55.68\""));
    }

    #[test]
    fn test_tags_and_date_rows() {
        let helpers = json!({});
        let options = RenderOptions::default();
        let tags = row("Tags", Some("tags"), None, None);
        let rendered = tags.render(&options, &json!({ "tags": ["havn", "<b>"] }), &helpers);
        assert!(rendered.contains("<ul class=\"tags\"><li>havn</li><li>&lt;b&gt;</li></ul>"));

        let date = row("Dato", Some("date"), None, Some("creation_time"));
        let rendered = date.render(&options, &json!({ "creation_time": "1901-05-17T10:00:00Z" }), &helpers);
        assert!(rendered.contains(">1901-05-17<"));
    }
}
