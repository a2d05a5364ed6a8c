/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// An asset addressed by its collection (catalog) and id within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub collection: String,
    pub id: String,
}

impl AssetRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Id of the asset's document in the search index.
    pub fn document_id(&self) -> String {
        format!("{}-{}", self.collection, self.id)
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
