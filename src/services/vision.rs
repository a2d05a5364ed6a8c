// Image labelling services used for motif tag suggestions.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{read_json, ServiceError};

const GOOGLE: &str = "google-vision";
const OXFORD: &str = "oxford-vision";

/// Google Cloud Vision `images:annotate`.
#[derive(Debug, Clone)]
pub struct GoogleVision {
    http: Client,
    base_url: String,
    api_key: String,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    label_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    landmark_annotations: Vec<EntityAnnotation>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

impl GoogleVision {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>, max_results: u32) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_results,
        }
    }

    /// Labels followed by landmarks, as returned by the API.
    pub async fn labels(&self, image_url: &str) -> Result<Vec<String>, ServiceError> {
        if self.api_key.is_empty() {
            return Err(ServiceError::NotConfigured("google.api_key"));
        }

        let body = json!({
            "requests": [{
                "image": { "source": { "imageUri": image_url } },
                "features": [
                    { "type": "LABEL_DETECTION", "maxResults": self.max_results },
                    { "type": "LANDMARK_DETECTION", "maxResults": self.max_results }
                ]
            }]
        });

        let response = self
            .http
            .post(format!("{}/v1/images:annotate", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(ServiceError::http(GOOGLE))?;

        let parsed: AnnotateResponse = read_json(GOOGLE, response).await?;
        let first = parsed.responses.into_iter().next().unwrap_or_default();
        if let Some(error) = first.error {
            return Err(ServiceError::decode(GOOGLE, error.to_string()));
        }

        Ok(first
            .label_annotations
            .into_iter()
            .chain(first.landmark_annotations)
            .map(|annotation| annotation.description)
            .collect())
    }
}

/// Microsoft Project Oxford (Cognitive Services) image analysis.
#[derive(Debug, Clone)]
pub struct OxfordVision {
    http: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(default)]
    name: Option<String>,
}

impl OxfordVision {
    pub fn new(http: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Category names split into their `_`-separated parts.
    pub async fn categories(&self, image_url: &str) -> Result<Vec<String>, ServiceError> {
        let response = self
            .http
            .post(format!("{}/vision/v1.0/analyze", self.endpoint))
            .query(&[("visualFeatures", "ImageType,Categories")])
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .json(&json!({ "url": image_url }))
            .send()
            .await
            .map_err(ServiceError::http(OXFORD))?;

        let parsed: AnalyzeResponse = read_json(OXFORD, response).await?;
        Ok(split_category_names(
            parsed.categories.into_iter().map(|c| c.name.unwrap_or_default()),
        ))
    }
}

/// `"outdoor_water"` becomes `["outdoor", "water"]`; empty parts are kept for the caller to drop.
pub(crate) fn split_category_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    names
        .into_iter()
        .flat_map(|name| name.split('_').map(str::to_string).collect::<Vec<_>>())
        .collect()
}
