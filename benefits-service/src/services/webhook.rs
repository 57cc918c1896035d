//! Client for the external AI workflow webhook.

use crate::models::Benefit;
use anyhow::anyhow;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use service_core::error::AppError;
use tracing::{error, info, instrument};

/// Body POSTed to the webhook.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<&'a Value>,
    pub benefits: &'a [Benefit],
    /// RFC 3339, UTC
    pub timestamp: String,
}

#[derive(Clone)]
pub struct AiWebhookClient {
    client: Client,
    url: Option<String>,
}

impl AiWebhookClient {
    pub fn new(client: Client, url: Option<String>) -> Self {
        Self { client, url }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Relay the query and catalog, returning the webhook's JSON reply.
    /// A missing URL, a transport failure, a non-2xx status and a non-JSON
    /// body are all errors; none are retried.
    #[instrument(skip(self, payload), fields(benefit_count = payload.benefits.len()))]
    pub async fn send(&self, payload: &WebhookPayload<'_>) -> Result<Value, AppError> {
        let url = self.url.as_deref().ok_or_else(|| {
            error!("AI webhook URL is not configured");
            AppError::ConfigurationError(anyhow!("N8N_WEBHOOK_URL environment variable not set"))
        })?;

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Error sending to AI webhook");
                AppError::FetchError(anyhow!("Webhook request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "AI webhook returned an error status");
            return Err(AppError::FetchError(anyhow!(
                "Webhook request failed with status: {}",
                status.as_u16()
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            error!(error = %e, "AI webhook returned a non-JSON body");
            AppError::FetchError(anyhow!("Webhook response is not JSON: {}", e))
        })?;

        info!("AI processing completed successfully");
        Ok(body)
    }
}
