//! `GET /benefits`: the filtered catalog.

use crate::models::BenefitFilter;
use crate::startup::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Response,
};
use service_core::{error::AppError, response};

/// Query string of the listing endpoint. Empty values mean "not given".
#[derive(Debug, Default)]
pub struct ListBenefitsParams {
    pub category: Option<String>,
    pub bank: Option<String>,
    pub limit: Option<String>,
}

impl ListBenefitsParams {
    /// Collect the known keys from raw query pairs. A repeated key keeps
    /// its last value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        pairs
            .into_iter()
            .fold(Self::default(), |mut params, (key, value)| {
                match key.as_str() {
                    "category" => params.category = Some(value),
                    "bank" => params.bank = Some(value),
                    "limit" => params.limit = Some(value),
                    _ => {}
                }
                params
            })
    }

    pub fn into_filter(self) -> Result<BenefitFilter, AppError> {
        let limit = match non_empty(self.limit) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(AppError::BadRequest(
                        "limit must be a positive integer".to_string(),
                    ))
                }
            },
            None => None,
        };

        Ok(BenefitFilter {
            category: non_empty(self.category),
            bank: non_empty(self.bank),
            limit,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub async fn list_benefits(
    State(state): State<AppState>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(pairs) = pairs.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let filter = ListBenefitsParams::from_pairs(pairs).into_filter()?;

    tracing::info!(
        category = ?filter.category,
        bank = ?filter.bank,
        limit = ?filter.limit,
        "Listing benefits"
    );

    let resolved = state.catalog.resolve(&filter).await?;

    tracing::info!(
        source = %resolved.source,
        count = resolved.benefits.len(),
        "Benefits resolved"
    );

    Ok(response::success(resolved.benefits))
}
