//! Source selection for the benefits listing: spreadsheet first, database
//! as the fallback.

use super::database::BenefitStore;
use super::sheets::SheetsClient;
use crate::models::{Benefit, BenefitFilter, BenefitSource};
use anyhow::anyhow;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, warn};

/// A benefits list and the source that produced it.
#[derive(Debug, Clone)]
pub struct ResolvedBenefits {
    pub source: BenefitSource,
    pub benefits: Vec<Benefit>,
}

/// Shared by the listing and search handlers, so search reuses the exact
/// listing behavior without going back over HTTP.
#[derive(Clone)]
pub struct BenefitCatalog {
    sheets: Option<SheetsClient>,
    store: Arc<dyn BenefitStore>,
}

impl BenefitCatalog {
    pub fn new(sheets: Option<SheetsClient>, store: Arc<dyn BenefitStore>) -> Self {
        Self { sheets, store }
    }

    pub fn store(&self) -> &Arc<dyn BenefitStore> {
        &self.store
    }

    /// Resolve the filtered list.
    ///
    /// With a sheet configured, its rows are filtered in process
    /// (case-insensitive). Any sheet failure, or no sheet at all, falls
    /// through to the database, which filters in SQL (exact match). The
    /// two paths can therefore disagree on e.g. `?category=dental` vs a
    /// stored `Dental`.
    ///
    /// Fails with `SourceUnavailable` when the database is the last resort
    /// and is unreachable or its query fails; nothing partial is returned.
    pub async fn resolve(&self, filter: &BenefitFilter) -> Result<ResolvedBenefits, AppError> {
        if let Some(sheets) = &self.sheets {
            info!("Fetching benefits from Google Sheets...");
            match sheets.fetch_benefits().await {
                Ok(rows) => {
                    let benefits = filter.apply_ignore_case(rows);
                    info!(
                        count = benefits.len(),
                        "Retrieved benefits from Google Sheets"
                    );
                    return Ok(ResolvedBenefits {
                        source: BenefitSource::Spreadsheet,
                        benefits,
                    });
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        "Failed to fetch from Google Sheets, falling back to database"
                    );
                }
            }
        }

        self.resolve_from_database(filter).await
    }

    async fn resolve_from_database(
        &self,
        filter: &BenefitFilter,
    ) -> Result<ResolvedBenefits, AppError> {
        if !self.store.check_connection().await {
            return Err(AppError::SourceUnavailable(anyhow!(
                "No benefit source available: database unreachable"
            )));
        }

        let benefits = self
            .store
            .fetch_benefits(filter)
            .await
            .map_err(|e| match e {
                AppError::SourceUnavailable(_) => e,
                other => AppError::SourceUnavailable(anyhow!("Database query failed: {}", other)),
            })?;

        info!(count = benefits.len(), "Retrieved benefits from database");
        Ok(ResolvedBenefits {
            source: BenefitSource::Database,
            benefits,
        })
    }
}
