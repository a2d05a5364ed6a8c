use async_trait::async_trait;
use serde_json::{json, Value};

use crate::services::{Elasticsearch, ServiceError};
use crate::types::AssetRef;

/// Document field holding the crowd tags of an asset.
pub const CROWD_TAG_FIELD: &str = "tags_crowd";

/// All tags of an asset; crowd tags are copied here so typeahead and search see them.
pub const TAG_FIELD: &str = "tags";

/// Persistence for crowd motif tags.
#[async_trait]
pub trait MotifTagStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Add `tags` to the asset; tags already present are ignored.
    async fn save(&self, asset: &AssetRef, tags: &[String]) -> Result<(), ServiceError>;

    /// Make saved tags searchable and return the asset's current tags.
    async fn update_index(&self, asset: &AssetRef) -> Result<Value, ServiceError>;

    /// Known tags starting with `text`; an empty `text` matches every tag.
    async fn typeahead(&self, text: &str) -> Result<Vec<String>, ServiceError>;
}

/// Stores crowd tags directly on the asset documents of the search index.
#[derive(Debug, Clone)]
pub struct ElasticsearchTagStore {
    es: Elasticsearch,
    index: String,
    typeahead_size: u32,
}

impl ElasticsearchTagStore {
    pub fn new(es: Elasticsearch, index: impl Into<String>, typeahead_size: u32) -> Self {
        Self {
            es,
            index: index.into(),
            typeahead_size,
        }
    }
}

#[async_trait]
impl MotifTagStore for ElasticsearchTagStore {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn save(&self, asset: &AssetRef, tags: &[String]) -> Result<(), ServiceError> {
        let tags = normalize_tags(tags);
        if tags.is_empty() {
            return Ok(());
        }

        let body = json!({
            "script": {
                "lang": "painless",
                "source": "for (f in params.fields) { if (ctx._source[f] == null) { ctx._source[f] = []; } \
                           for (t in params.tags) { if (!ctx._source[f].contains(t)) { ctx._source[f].add(t); } } }",
                "params": { "fields": [CROWD_TAG_FIELD, TAG_FIELD], "tags": tags }
            }
        });

        self.es.update(&self.index, &asset.document_id(), &body).await?;
        tracing::info!(asset = %asset, ?tags, "saved crowd tags");
        Ok(())
    }

    async fn update_index(&self, asset: &AssetRef) -> Result<Value, ServiceError> {
        self.es.refresh(&self.index).await?;
        let source = self.es.get_source(&self.index, &asset.document_id()).await?;
        let tags = source.get(CROWD_TAG_FIELD).cloned().unwrap_or_else(|| json!([]));

        Ok(json!({
            "collection": asset.collection,
            "id": asset.id,
            "tags": tags
        }))
    }

    async fn typeahead(&self, text: &str) -> Result<Vec<String>, ServiceError> {
        let body = typeahead_query(text, self.typeahead_size);
        let response = self.es.search(&self.index, &body).await?;
        let suggestions = response
            .aggregations
            .as_ref()
            .and_then(|aggs| aggs.pointer("/suggestions/buckets"))
            .and_then(Value::as_array)
            .map(|buckets| {
                buckets
                    .iter()
                    .filter_map(|b| b.get("key").and_then(Value::as_str).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(suggestions)
    }
}

/// Terms aggregation over all tags whose value starts with `text`.
pub fn typeahead_query(text: &str, size: u32) -> Value {
    json!({
        "size": 0,
        "aggs": {
            "suggestions": {
                "terms": {
                    "field": TAG_FIELD,
                    "include": format!("{}.*", escape_regex(text)),
                    "size": size
                }
            }
        }
    })
}

/// Trimmed, lowercased, non-empty, without duplicates, in input order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

/// Escape Lucene regular-expression operators so `text` matches literally.
pub fn escape_regex(text: &str) -> String {
    const RESERVED: &[char] = &[
        '.', '?', '+', '*', '|', '{', '}', '[', ']', '(', ')', '"', '\\', '#', '@', '&', '<', '>', '~',
    ];
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
