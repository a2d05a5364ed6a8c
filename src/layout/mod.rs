// Asset page layout: configured sections made of typed rows.
//
// Layouts are compiled once at startup. A row is shown when the asset's metadata
// changes its rendering; a section is shown when any of its rows is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{AppConfig, LayoutConfig};

pub mod row;
pub mod template;

pub use row::{Row, RowType};
pub use template::Template;

/// Asset type whose layout is used for asset pages.
pub const DEFAULT_ASSET_TYPE: &str = "asset";

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Missing a template for row type: {0}")]
    UnknownRowType(String),

    #[error("Section named \"{0}\" not configured")]
    UnknownSection(String),

    #[error("No layout configured for type \"{0}\"")]
    UnknownLayout(String),

    #[error("invalid row template: {0}")]
    Template(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Show prompts inviting users to contribute missing data.
    #[serde(default)]
    pub show_call_to_action: bool,
}

impl RenderOptions {
    pub fn to_value(&self) -> Value {
        json!({ "show_call_to_action": self.show_call_to_action })
    }
}

#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub title: Option<String>,
    pub rows: Vec<Row>,
}

impl Section {
    pub fn has_values(&self, options: &RenderOptions, metadata: &Value, helpers: &Value) -> bool {
        self.rows.iter().any(|row| row.has_value(options, metadata, helpers))
    }

    pub fn render(&self, options: &RenderOptions, metadata: &Value, helpers: &Value) -> String {
        let mut html = format!("<section class=\"asset-section asset-section--{}\">", template::html_escape(&self.name));
        if let Some(title) = &self.title {
            html.push_str(&format!("<h2>{}</h2>", template::html_escape(title)));
        }
        for row in self.rows.iter().filter(|row| row.has_value(options, metadata, helpers)) {
            html.push_str(&row.render(options, metadata, helpers));
        }
        html.push_str("</section>");
        html
    }
}

/// Compiled layout for one asset type.
#[derive(Debug, Clone)]
pub struct Layout {
    sections: BTreeMap<String, Section>,
    helpers: Value,
}

impl Layout {
    pub fn compile(config: &LayoutConfig, helpers: Value) -> Result<Self, LayoutError> {
        let mut sections = BTreeMap::new();
        for (name, section) in &config.sections {
            let rows = section
                .rows
                .iter()
                .map(Row::compile)
                .collect::<Result<Vec<_>, _>>()?;
            sections.insert(
                name.clone(),
                Section {
                    name: name.clone(),
                    title: section.title.clone(),
                    rows,
                },
            );
        }
        Ok(Self { sections, helpers })
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Markup of one section.
    pub fn render(&self, section_name: &str, options: &RenderOptions, metadata: &Value) -> Result<String, LayoutError> {
        let section = self
            .sections
            .get(section_name)
            .filter(|_| !section_name.is_empty())
            .ok_or_else(|| LayoutError::UnknownSection(section_name.to_string()))?;
        Ok(section.render(options, metadata, &self.helpers))
    }

    /// Markup of every section that has values, keyed by section name.
    pub fn render_all(&self, options: &RenderOptions, metadata: &Value) -> BTreeMap<String, String> {
        self.sections
            .iter()
            .filter(|(_, section)| section.has_values(options, metadata, &self.helpers))
            .map(|(name, section)| (name.clone(), section.render(options, metadata, &self.helpers)))
            .collect()
    }
}

/// Values every template can reach in addition to the metadata.
pub fn helpers_for(config: &AppConfig) -> Value {
    json!({
        "site_title": config.site.title,
        "theme_color": config.site.theme_color,
    })
}

/// Compile every configured layout.
pub fn compile_layouts(config: &AppConfig) -> Result<BTreeMap<String, Layout>, LayoutError> {
    let helpers = helpers_for(config);
    config
        .layouts
        .iter()
        .map(|(name, layout)| Ok((name.clone(), Layout::compile(layout, helpers.clone())?)))
        .collect()
}
