use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Page layout for one asset type, as written in the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub sections: BTreeMap<String, SectionConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub title: Option<String>,
    pub rows: Vec<RowConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RowConfig {
    pub title: String,
    /// Row type name; `simple` when absent.
    #[serde(rename = "type")]
    pub row_type: Option<String>,
    pub template: Option<String>,
    /// Dotted metadata path read by the built-in row types.
    pub field: Option<String>,
}
