//! Award submission over HTTP.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, InvalidHeaderValue};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::credentials::Credentials;
use crate::model::Award;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid credential header: {0}")]
    Header(#[from] InvalidHeaderValue),
    #[error("failed to serialize award: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to send award to {endpoint}: {source}")]
    Send {
        endpoint: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read award response: {0}")]
    ReadBody(#[source] reqwest::Error),
}

/// What the API answered. The body is kept verbatim and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub status: StatusCode,
    pub body: String,
}

/// Destination of the awards a monitor produces.
#[async_trait]
pub trait AwardSink: Send + Sync {
    async fn submit(&self, award: &Award) -> Result<SubmissionReceipt, SubmitError>;
}

/// Posts awards as JSON to the scoring API's awards endpoint.
#[derive(Debug, Clone)]
pub struct AwardSubmitter {
    client: Client,
    endpoint: Url,
    headers: HeaderMap,
}

impl AwardSubmitter {
    pub fn new(
        credentials: &Credentials,
        endpoint: Url,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, SubmitError> {
        let client = credentials
            .build_client(&endpoint, issued_at)
            .map_err(SubmitError::Client)?;
        let headers = credentials.request_headers()?;
        Ok(Self {
            client,
            endpoint,
            headers,
        })
    }
}

#[async_trait]
impl AwardSink for AwardSubmitter {
    async fn submit(&self, award: &Award) -> Result<SubmissionReceipt, SubmitError> {
        let body = serde_json::to_vec(award)?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await
            .map_err(|source| SubmitError::Send {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(SubmitError::ReadBody)?;
        Ok(SubmissionReceipt { status, body })
    }
}
