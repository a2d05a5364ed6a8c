use reqwest::{Client, StatusCode};
use url::Url;

use super::{expect_success, ServiceError};

const SERVICE: &str = "google-cloud-storage";

/// Google Cloud Storage JSON API client, used as the thumbnail cache.
#[derive(Debug, Clone)]
pub struct CloudStorage {
    http: Client,
    api_url: String,
    download_url: String,
    token: Option<String>,
}

impl CloudStorage {
    pub fn new(
        http: Client,
        api_url: impl Into<String>,
        download_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            download_url: download_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Public URL of an object in a publicly readable bucket.
    pub fn public_url(&self, bucket: &str, object: &str) -> String {
        [self.download_url.as_str(), bucket, object].join("/")
    }

    fn object_url(&self, bucket: &str, object: &str) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&self.api_url).map_err(|e| ServiceError::decode(SERVICE, e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::decode(SERVICE, "storage API URL cannot be a base"))?
            .extend(["storage", "v1", "b", bucket, "o", object]);
        Ok(url)
    }

    fn with_token(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn exists(&self, bucket: &str, object: &str) -> Result<bool, ServiceError> {
        let url = self.object_url(bucket, object)?;
        let response = self
            .with_token(self.http.get(url))
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        expect_success(SERVICE, response).await?;
        Ok(true)
    }

    pub async fn upload(
        &self,
        bucket: &str,
        object: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ServiceError> {
        let mut url = Url::parse(&self.api_url).map_err(|e| ServiceError::decode(SERVICE, e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::decode(SERVICE, "storage API URL cannot be a base"))?
            .extend(["upload", "storage", "v1", "b", bucket, "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", object);

        let response = self
            .with_token(self.http.post(url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        expect_success(SERVICE, response).await?;
        tracing::info!(bucket, object, "uploaded cache object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url() {
        let storage = CloudStorage::new(
            Client::new(),
            "https://storage.googleapis.com",
            "https://storage.googleapis.com/",
            None,
        );
        assert_eq!(
            storage.public_url("thumbs", "kbh-museum-1-350-middle-center.jpg"),
            "https://storage.googleapis.com/thumbs/kbh-museum-1-350-middle-center.jpg"
        );
    }

    #[test]
    fn test_object_url_encodes_names() {
        let storage = CloudStorage::new(Client::new(), "http://127.0.0.1:9000", "http://x", None);
        let url = storage.object_url("thumbs", "a b/c.jpg").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/storage/v1/b/thumbs/o/a%20b%2Fc.jpg");
    }
}
