//! Webhook delivery.
//!
//! One POST per (entry, destination). Failures are reported to the caller
//! and never retried here.

use async_trait::async_trait;
use serde_json::Value;

const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook returned {status}: {body}")]
    HttpStatus { status: u16, body: String },
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, payload: &Value) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
}

impl WebhookTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for WebhookTransport {
    async fn post(&self, url: &str, payload: &Value) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body_text: String = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string())
                .chars()
                .take(ERROR_BODY_LIMIT)
                .collect();
            tracing::warn!(%status, body = %body_text, "webhook returned non-2xx status");
            return Err(DeliveryError::HttpStatus {
                status: status.as_u16(),
                body: body_text,
            });
        }

        tracing::debug!(%status, "webhook notification delivered");
        Ok(())
    }
}
