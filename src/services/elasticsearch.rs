use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{expect_success, read_json, ServiceError};

const SERVICE: &str = "elasticsearch";

/// Minimal Elasticsearch REST client for the asset index.
#[derive(Debug, Clone)]
pub struct Elasticsearch {
    http: Client,
    base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Hits,
    #[serde(default)]
    pub aggregations: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

impl Elasticsearch {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Fetch the `_source` of a single document.
    pub async fn get_source(&self, index: &str, id: &str) -> Result<Value, ServiceError> {
        let response = self
            .http
            .get(self.url(&format!("{}/_source/{}", index, id)))
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!("document {}/{}", index, id)));
        }

        read_json(SERVICE, response).await
    }

    pub async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse, ServiceError> {
        tracing::debug!(index, %body, "elasticsearch search");
        let response = self
            .http
            .post(self.url(&format!("{}/_search", index)))
            .json(body)
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        read_json(SERVICE, response).await
    }

    pub async fn update(&self, index: &str, id: &str, body: &Value) -> Result<Value, ServiceError> {
        let response = self
            .http
            .post(self.url(&format!("{}/_update/{}", index, id)))
            .json(body)
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!("document {}/{}", index, id)));
        }

        read_json(SERVICE, response).await
    }

    pub async fn refresh(&self, index: &str) -> Result<(), ServiceError> {
        let response = self
            .http
            .post(self.url(&format!("{}/_refresh", index)))
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        expect_success(SERVICE, response).await?;
        Ok(())
    }

    /// Cluster root request, used by the health check.
    pub async fn ping(&self) -> Result<(), ServiceError> {
        let response = self
            .http
            .get(self.url(""))
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        expect_success(SERVICE, response).await?;
        Ok(())
    }
}
