use reqwest::Client;

use super::ServiceError;

const SERVICE: &str = "cip";

/// Proxy to the Central Image Platform, which holds the original asset files.
#[derive(Debug, Clone)]
pub struct CipClient {
    http: Client,
    base_url: String,
}

impl CipClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn thumbnail_url(&self, collection: &str, id: &str) -> String {
        format!("{}/preview/thumbnail/{}/{}", self.base_url, collection, id)
    }

    pub fn download_url(&self, collection: &str, id: &str, size: Option<&str>) -> String {
        match size {
            Some(size) => format!("{}/asset/download/{}/{}/{}", self.base_url, collection, id, size),
            None => format!("{}/asset/download/{}/{}", self.base_url, collection, id),
        }
    }

    /// Start a thumbnail request; the caller inspects the status.
    pub async fn proxy_thumbnail(&self, collection: &str, id: &str) -> Result<reqwest::Response, ServiceError> {
        self.http
            .get(self.thumbnail_url(collection, id))
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))
    }

    pub async fn proxy_download(
        &self,
        collection: &str,
        id: &str,
        size: Option<&str>,
    ) -> Result<reqwest::Response, ServiceError> {
        self.http
            .get(self.download_url(collection, id, size))
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))
    }

    /// Fetch thumbnail bytes, treating any non-200 status as an error.
    pub async fn fetch_thumbnail(&self, collection: &str, id: &str) -> Result<Vec<u8>, ServiceError> {
        let response = self.proxy_thumbnail(collection, id).await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(ServiceError::Status {
                service: SERVICE,
                status: response.status().as_u16(),
                body: "non 200 status from the CIP".to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(ServiceError::http(SERVICE))?;
        Ok(bytes.to_vec())
    }
}
