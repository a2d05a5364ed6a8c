use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{read_json, ServiceError};

const SERVICE: &str = "google-translate";

/// Google Translate v2 client.
#[derive(Debug, Clone)]
pub struct Translator {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

impl Translator {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Translate every text, returning one translation per input in order.
    pub async fn translate(&self, texts: &[String], from: &str, to: &str) -> Result<Vec<String>, ServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if self.api_key.is_empty() {
            return Err(ServiceError::NotConfigured("google.api_key"));
        }

        let response = self
            .http
            .post(format!("{}/language/translate/v2", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "q": texts,
                "source": from,
                "target": to,
                "format": "text"
            }))
            .send()
            .await
            .map_err(ServiceError::http(SERVICE))?;

        let parsed: TranslateResponse = read_json(SERVICE, response).await?;
        Ok(parsed
            .data
            .translations
            .into_iter()
            .map(|t| t.translated_text)
            .collect())
    }
}
