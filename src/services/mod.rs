// Clients for the external services the site is built on.
//
// Each client wraps the shared `reqwest::Client` and talks to one upstream API.
// Failures are reported as `ServiceError`, which the HTTP layer maps to 4xx/5xx.

use serde::de::DeserializeOwned;
use thiserror::Error;

pub mod auth0;
pub mod cip;
pub mod elasticsearch;
pub mod storage;
pub mod translate;
pub mod vision;

pub use auth0::{Auth0Service, Auth0Profile};
pub use cip::CipClient;
pub use elasticsearch::{Elasticsearch, SearchHit, SearchResponse};
pub use storage::CloudStorage;
pub use translate::Translator;
pub use vision::{GoogleVision, OxfordVision};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} responded with status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} returned an unexpected payload: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl ServiceError {
    /// Name of the upstream that failed.
    pub fn service(&self) -> &str {
        match self {
            ServiceError::Http { service, .. }
            | ServiceError::Status { service, .. }
            | ServiceError::Decode { service, .. } => service,
            ServiceError::NotFound(_) => "lookup",
            ServiceError::NotConfigured(service) => service,
        }
    }

    pub(crate) fn http(service: &'static str) -> impl FnOnce(reqwest::Error) -> ServiceError {
        move |source| ServiceError::Http { service, source }
    }

    pub(crate) fn decode(service: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Decode {
            service,
            message: message.into(),
        }
    }
}

/// Turn a non-2xx response into `ServiceError::Status`, keeping the body for the logs.
pub(crate) async fn expect_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> Result<T, ServiceError> {
    let response = expect_success(service, response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::decode(service, e.to_string()))
}
