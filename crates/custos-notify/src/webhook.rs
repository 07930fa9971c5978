//! HTTP webhook sink.

use std::sync::Arc;

use async_trait::async_trait;
use custos_crypto::KeyPair;
use url::Url;
use uuid::Uuid;

use crate::error::SinkError;
use crate::sink::{AlertNotification, AlertSink};

/// Carries the idempotency key (the alert id); constant across retries.
pub const ALERT_HEADER: &str = "x-custos-alert";

/// Carries a fresh delivery id per attempt, for receiver-side tracing.
pub const DELIVERY_HEADER: &str = "x-custos-delivery";

/// Carries the hex Ed25519 signature over the request body, when signing
/// is configured.
pub const SIGNATURE_HEADER: &str = "x-custos-signature";

/// How much of a rejecting response body ends up in the error.
const ERROR_BODY_LIMIT: usize = 256;

/// Sink that POSTs the JSON notification to an HTTP endpoint.
///
/// A 2xx response is an acknowledgement; anything else is a rejection the
/// dispatcher will retry. When built with a signing key, every request
/// carries an Ed25519 signature over the exact body bytes so receivers can
/// authenticate the sender.
pub struct WebhookSink {
    name: String,
    url: Url,
    client: reqwest::Client,
    signer: Option<Arc<KeyPair>>,
}

impl WebhookSink {
    /// Create a sink posting to `url`.
    #[must_use]
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            url,
            client: reqwest::Client::new(),
            signer: None,
        }
    }

    /// Sign every request body with `keypair`.
    #[must_use]
    pub fn with_signer(mut self, keypair: Arc<KeyPair>) -> Self {
        self.signer = Some(keypair);
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, pools).
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The target endpoint.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, notification: &AlertNotification) -> Result<(), SinkError> {
        let body = serde_json::to_vec(notification)
            .map_err(|e| SinkError::Payload(e.to_string()))?;

        let mut request = self
            .client
            .post(self.url.clone())
            .header("content-type", "application/json")
            .header(ALERT_HEADER, notification.idempotency_key.to_string())
            .header(DELIVERY_HEADER, Uuid::new_v4().to_string());
        if let Some(signer) = &self.signer {
            let signature = signer.sign(&body);
            request = request.header(SIGNATURE_HEADER, hex::encode(signature.as_bytes()));
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        Err(SinkError::Rejected(format!(
            "status {status}: {}",
            truncated(&detail, ERROR_BODY_LIMIT)
        )))
    }
}

impl std::fmt::Debug for WebhookSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSink")
            .field("name", &self.name)
            .field("url", &self.url.as_str())
            .field("signed", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

/// Cut `text` at a character boundary at or below `limit` bytes.
fn truncated(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    &text[..end]
}
