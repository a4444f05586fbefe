//! Signal alert delivery
//!
//! Every fired signal is logged; a webhook sink can be layered on top from
//! configuration. Delivery failures surface as errors for the caller to
//! log, never to kill the monitoring loop.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

use crate::error::GridError;
use crate::types::SignalEvent;

/// Where fired signals go.
pub enum Alerter {
    /// Log only.
    Log,
    /// Log, then POST to a webhook.
    Webhook(WebhookAlerter),
}

impl Alerter {
    /// Build from an optional webhook URL.
    pub fn from_webhook_url(url: Option<String>) -> Self {
        match url {
            Some(url) if !url.is_empty() => Alerter::Webhook(WebhookAlerter::new(url)),
            _ => Alerter::Log,
        }
    }

    /// Deliver one signal.
    pub async fn send(&self, event: &SignalEvent) -> Result<(), GridError> {
        warn!("{}", event.subject());
        match self {
            Alerter::Log => Ok(()),
            Alerter::Webhook(webhook) => webhook.post(event).await,
        }
    }
}

/// POSTs alert subject and body as JSON to a configured URL.
pub struct WebhookAlerter {
    client: Client,
    url: String,
}

impl WebhookAlerter {
    pub fn new(url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        WebhookAlerter { client, url }
    }

    async fn post(&self, event: &SignalEvent) -> Result<(), GridError> {
        let response = self
            .client
            .post(&self.url)
            .json(&payload(event))
            .send()
            .await
            .map_err(|e| GridError::AlertDeliveryFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GridError::AlertDeliveryFailure(format!(
                "webhook returned status {}",
                response.status()
            )));
        }

        Ok(())
    }
}

fn payload(event: &SignalEvent) -> Value {
    json!({
        "subject": event.subject(),
        "text": event.body(),
    })
}
