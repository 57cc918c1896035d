//! Spreadsheet source: a CSV export fetched over HTTP.

use super::google_auth::ServiceAccountAuth;
use crate::config::SheetsConfig;
use crate::models::Benefit;
use anyhow::anyhow;
use reqwest::Client;
use secrecy::ExposeSecret;
use service_core::error::AppError;
use tracing::{error, info, instrument};

/// Parse sheet CSV into benefit records.
///
/// This is a line/comma splitter, not a CSV reader: there is no quoting,
/// so a comma or newline inside a quoted cell splits the cell. Every `"`
/// is dropped from headers and values. Existing sheets are authored
/// against exactly this behavior.
///
/// Per record, a non-empty `title` fills a blank `name`, and a blank `id`
/// becomes the 1-based data line number. Those ids are only stable within
/// one fetch.
pub fn parse_benefits_csv(text: &str) -> Vec<Benefit> {
    let mut lines = text.trim().split('\n');
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = split_cells(header_line).collect();

    lines
        .enumerate()
        .map(|(index, line)| {
            let values: Vec<String> = split_cells(line).collect();
            let mut benefit: Benefit = headers
                .iter()
                .enumerate()
                .map(|(col, header)| {
                    (header.clone(), values.get(col).cloned().unwrap_or_default())
                })
                .collect();

            if benefit.is_blank("name") && !benefit.is_blank("title") {
                let title = benefit.get("title").cloned().unwrap_or_default();
                benefit.insert("name", title);
            }
            if benefit.is_blank("id") {
                benefit.insert("id", (index + 1).to_string());
            }

            benefit
        })
        .collect()
}

fn split_cells(line: &str) -> impl Iterator<Item = String> + '_ {
    line.split(',').map(|cell| cell.trim().replace('"', ""))
}

/// HTTP client for the configured sheet.
#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    url: String,
    auth: Option<ServiceAccountAuth>,
}

impl SheetsClient {
    pub fn new(client: Client, url: impl Into<String>, auth: Option<ServiceAccountAuth>) -> Self {
        Self {
            client,
            url: url.into(),
            auth,
        }
    }

    /// Build from configuration. Fails when no sheet URL is configured or
    /// the service-account key is unusable.
    pub fn from_config(client: Client, config: &SheetsConfig) -> Result<Self, AppError> {
        let url = config.url.as_deref().ok_or_else(|| {
            AppError::ConfigurationError(anyhow!("GOOGLE_SHEETS_URL environment variable not set"))
        })?;

        let auth = config
            .credentials()
            .map(|(email, key)| {
                ServiceAccountAuth::new(
                    client.clone(),
                    email,
                    key.expose_secret(),
                    &config.token_url,
                )
            })
            .transpose()?;

        Ok(Self::new(client, url, auth))
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Download and parse the sheet, authenticating first when
    /// service-account credentials were configured.
    #[instrument(skip(self), fields(authenticated = self.auth.is_some()))]
    pub async fn fetch_benefits(&self) -> Result<Vec<Benefit>, AppError> {
        let mut request = self.client.get(&self.url);
        if let Some(auth) = &self.auth {
            let token = auth.access_token().await?;
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Error fetching from Google Sheets");
            AppError::FetchError(anyhow!("Sheet request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Google Sheets returned an error status");
            return Err(AppError::FetchError(anyhow!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        let text = response.text().await.map_err(|e| {
            error!(error = %e, "Error reading Google Sheets body");
            AppError::FetchError(anyhow!("Failed to read sheet body: {}", e))
        })?;

        let benefits = parse_benefits_csv(&text);
        info!(count = benefits.len(), "Parsed benefits from Google Sheets");
        Ok(benefits)
    }
}
