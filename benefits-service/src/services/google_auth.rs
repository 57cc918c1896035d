//! OAuth2 JWT-bearer exchange for service-account access to a sheet.

use anyhow::anyhow;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Claims of the signed assertion sent to the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Service account email
    pub iss: String,
    pub scope: String,
    /// Token endpoint URL
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Turns a private key as it usually arrives through an environment
/// variable into PEM text: surrounding quotes removed and literal `\n`
/// sequences turned into newlines.
pub fn normalize_private_key(raw: &str) -> Result<String, AppError> {
    let mut key = raw.trim();
    for quote in ['"', '\''] {
        if key.len() >= 2 && key.starts_with(quote) && key.ends_with(quote) {
            key = &key[1..key.len() - 1];
        }
    }

    let key = key.replace("\\n", "\n");
    let key = key.trim();

    let has_begin = key.starts_with("-----BEGIN") && key.contains("PRIVATE KEY-----");
    let has_end = key.ends_with("PRIVATE KEY-----") && key.contains("-----END");
    if !has_begin || !has_end {
        return Err(AppError::ConfigurationError(anyhow!(
            "GOOGLE_PRIVATE_KEY is not a PEM private key (missing BEGIN/END markers)"
        )));
    }

    Ok(format!("{}\n", key))
}

/// Exchanges signed service-account assertions for bearer tokens.
#[derive(Clone)]
pub struct ServiceAccountAuth {
    client: Client,
    email: String,
    encoding_key: EncodingKey,
    token_url: String,
}

impl ServiceAccountAuth {
    pub fn new(
        client: Client,
        email: &str,
        private_key: &str,
        token_url: &str,
    ) -> Result<Self, AppError> {
        let pem = normalize_private_key(private_key)?;
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            AppError::ConfigurationError(anyhow!("Failed to parse private key: {}", e))
        })?;

        Ok(Self {
            client,
            email: email.to_string(),
            encoding_key,
            token_url: token_url.to_string(),
        })
    }

    pub fn claims(&self) -> AssertionClaims {
        let now = Utc::now();
        AssertionClaims {
            iss: self.email.clone(),
            scope: SHEETS_READONLY_SCOPE.to_string(),
            aud: self.token_url.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        }
    }

    /// RS256-signed assertion, valid for one hour.
    pub fn signed_assertion(&self) -> Result<String, AppError> {
        encode(
            &Header::new(Algorithm::RS256),
            &self.claims(),
            &self.encoding_key,
        )
        .map_err(|e| AppError::AuthError(anyhow!("Failed to sign assertion: {}", e)))
    }

    /// Fetch a fresh access token. Nothing is cached; every call performs
    /// a full exchange.
    pub async fn access_token(&self) -> Result<String, AppError> {
        let assertion = self.signed_assertion()?;

        let response = self
            .client
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token endpoint request failed");
                AppError::AuthError(anyhow!("Token request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Token exchange rejected");
            return Err(AppError::AuthError(anyhow!(
                "Token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Malformed token response");
            AppError::AuthError(anyhow!("Malformed token response: {}", e))
        })?;

        tracing::debug!(service_account = %self.email, "Obtained access token");
        Ok(token.access_token)
    }
}
