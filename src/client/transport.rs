//! Transport performing the actual API call.

use async_trait::async_trait;
use reqwest::header::{ACCEPT_CHARSET, CONTENT_TYPE};
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::document::Document;
use crate::error::{Result, SluiceError};

/// Header carrying the document signature.
pub const SIGNATURE_HEADER: &str = "Signature";

/// Response returned by the API for an accepted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Trait for submitting documents to the API.
///
/// Abstracts the HTTP client so the sender can be exercised without a
/// network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit a signed document.
    async fn submit(&self, document: &Document, signature: &str) -> Result<TransportResponse>;
}

/// Transport that POSTs documents as JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport from client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Get the endpoint documents are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(&self, document: &Document, signature: &str) -> Result<TransportResponse> {
        let body = document.to_json()?;

        debug!(endpoint = %self.endpoint, bytes = body.len(), "Posting document");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT_CHARSET, "utf-8")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(status = status.as_u16(), "Documents API rejected the request");
            return Err(SluiceError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// Transport that logs documents instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct DryRunTransport;

#[async_trait]
impl Transport for DryRunTransport {
    async fn submit(&self, document: &Document, signature: &str) -> Result<TransportResponse> {
        let body = document.to_json()?;
        info!(
            doc_id = document.doc_id.as_deref().unwrap_or("-"),
            signature_len = signature.len(),
            body = %body,
            "Dry run, document not sent"
        );
        Ok(TransportResponse {
            status: 200,
            body: String::new(),
        })
    }
}
