//! Document sender gated by the admission limiter.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::transport::{Transport, TransportResponse};
use crate::document::Document;
use crate::error::Result;
use crate::ratelimit::{CancellationToken, SlidingWindowLimiter};

/// Outcome of a send attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The document was admitted and accepted by the API
    Sent(TransportResponse),
    /// The wait for admission was cancelled; nothing was sent
    NotAdmitted,
}

impl SendOutcome {
    /// Whether the document went out.
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent(_))
    }
}

/// Sends documents through a transport, never faster than the limiter allows.
#[derive(Clone)]
pub struct DocumentSender {
    limiter: SlidingWindowLimiter,
    transport: Arc<dyn Transport>,
}

impl DocumentSender {
    /// Create a sender from a limiter and a transport.
    pub fn new(limiter: SlidingWindowLimiter, transport: Arc<dyn Transport>) -> Self {
        Self { limiter, transport }
    }

    /// Get the limiter gating this sender.
    pub fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    /// Wait for admission, then send the document.
    pub async fn send(&self, document: &Document, signature: &str) -> Result<SendOutcome> {
        self.send_with(document, signature, &CancellationToken::new())
            .await
    }

    /// Wait for admission unless `token` is cancelled first, then send.
    ///
    /// The transport is only called after admission, and no limiter lock is
    /// held while it runs.
    #[instrument(
        skip(self, document, signature, token),
        fields(doc_id = document.doc_id.as_deref().unwrap_or("-"))
    )]
    pub async fn send_with(
        &self,
        document: &Document,
        signature: &str,
        token: &CancellationToken,
    ) -> Result<SendOutcome> {
        if !self.limiter.admit_async(token).await {
            debug!("Not admitted, document dropped");
            return Ok(SendOutcome::NotAdmitted);
        }

        let response = self.transport.submit(document, signature).await?;
        info!(status = response.status, "Document sent");
        Ok(SendOutcome::Sent(response))
    }
}

impl std::fmt::Debug for DocumentSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSender")
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}
