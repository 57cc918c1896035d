//! `POST /search`: relay a free-text query plus the full catalog to the
//! AI webhook.

use crate::models::BenefitFilter;
use crate::services::WebhookPayload;
use crate::startup::AppState;
use axum::{body::Bytes, extract::State, response::Response};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use service_core::{error::AppError, response};

/// A validated search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// As sent; only the trimmed form is checked for emptiness.
    pub query: String,
    pub filters: Option<Value>,
}

impl SearchRequest {
    /// Validate a raw body. An empty body and a body that is not JSON are
    /// reported with different messages.
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        if body.is_empty() {
            return Err(AppError::BadRequest("Request body is required".to_string()));
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|_| AppError::BadRequest("Invalid JSON in request body".to_string()))?;

        let query = match value.get("query") {
            Some(Value::String(q)) if !q.trim().is_empty() => q.clone(),
            _ => {
                return Err(AppError::BadRequest(
                    "Query parameter is required and must be a non-empty string".to_string(),
                ))
            }
        };

        let filters = match value.get("filters") {
            None | Some(Value::Null) => None,
            Some(f @ Value::Object(_)) => Some(f.clone()),
            Some(_) => {
                return Err(AppError::BadRequest(
                    "Filters must be an object".to_string(),
                ))
            }
        };

        Ok(Self { query, filters })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub total_benefits: usize,
    pub ai_response: Value,
}

pub async fn search(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let request = SearchRequest::parse(&body)?;

    tracing::info!(query = %request.query, "Processing search query");

    // The whole catalog, resolved exactly as GET /benefits would.
    let resolved = state
        .catalog
        .resolve(&BenefitFilter::default())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Error getting benefits data"))?;

    tracing::info!(
        source = %resolved.source,
        count = resolved.benefits.len(),
        "Retrieved benefits for processing"
    );

    let payload = WebhookPayload {
        query: &request.query,
        filters: request.filters.as_ref(),
        benefits: &resolved.benefits,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    let ai_response = state.webhook.send(&payload).await?;

    Ok(response::success(SearchResponse {
        total_benefits: resolved.benefits.len(),
        query: request.query,
        ai_response,
    }))
}
