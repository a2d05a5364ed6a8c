use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Search results' aggregations and the filters currently applied.
#[derive(Debug, Clone, Deserialize)]
pub struct SidebarRequest {
    #[serde(default)]
    pub aggregations: Value,
    #[serde(default)]
    pub filters: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarResponse {
    pub aggregations: Value,
    pub filters: BTreeMap<String, Vec<String>>,
    pub filter_count: usize,
}

impl SidebarResponse {
    pub fn build(request: SidebarRequest) -> Self {
        let mut aggregations = request.aggregations;
        prune_empty_buckets(&mut aggregations);
        Self {
            filter_count: filter_count(&request.filters),
            aggregations,
            filters: request.filters,
        }
    }
}

/// Number of selected filter values across all fields.
pub fn filter_count(filters: &BTreeMap<String, Vec<String>>) -> usize {
    filters.values().map(Vec::len).sum()
}

/// Drop buckets without documents from `aggregations.<agg>.<field>.buckets`.
pub fn prune_empty_buckets(aggregations: &mut Value) {
    let Some(aggregations) = aggregations.as_object_mut() else {
        return;
    };

    for filtered in aggregations.values_mut() {
        let Some(fields) = filtered.as_object_mut() else {
            continue;
        };
        for aggregation in fields.values_mut() {
            if let Some(Value::Array(buckets)) = aggregation.get_mut("buckets") {
                buckets.retain(|bucket| bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0) > 0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sidebar_response() {
        let request: SidebarRequest = serde_json::from_value(json!({
            "aggregations": {
                "all": {
                    "catalog": {
                        "buckets": [
                            { "key": "kbh-museum", "doc_count": 12 },
                            { "key": "frb", "doc_count": 0 }
                        ]
                    },
                    "doc_count": 12
                }
            },
            "filters": { "catalog": ["kbh-museum"], "type": ["photo", "drawing"] }
        }))
        .unwrap();

        let response = SidebarResponse::build(request);
        assert_eq!(response.filter_count, 3);

        let buckets = response.aggregations["all"]["catalog"]["buckets"].as_array().unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0]["key"], "kbh-museum");

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["filterCount"], 3);
    }
}
