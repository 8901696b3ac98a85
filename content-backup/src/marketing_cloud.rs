#![doc = "HTTP client for the marketing content API: bridges the core `Authenticator` and `ContentSource` traits to real requests."]
//! # Marketing Cloud client
//!
//! [`MarketingCloudClient`] performs the two calls the backup run makes
//! against the marketing API:
//!
//! - a client-credentials token exchange (`POST auth_url`, JSON body)
//! - a content query filtered on modification date (`GET content_url`)
//!
//! Both calls go out exactly once. Timeouts are the `reqwest` defaults.
//! Transport and decoding failures map onto [`BackupError::Authentication`]
//! and [`BackupError::Fetch`] respectively.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use content_backup_core::asset::ContentAsset;
use content_backup_core::config::ClientCredentials;
use content_backup_core::contract::{AccessToken, Authenticator, ContentSource};
use content_backup_core::BackupError;

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct ContentPage {
    items: Option<Vec<Value>>,
}

/// `modifiedDate ge <since>`, with `since` in whole seconds.
pub fn modified_since_filter(since: DateTime<Utc>) -> String {
    format!(
        "modifiedDate ge {}",
        since.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

#[derive(Debug, Clone, Default)]
pub struct MarketingCloudClient {
    http: reqwest::Client,
}

impl MarketingCloudClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Authenticator for MarketingCloudClient {
    async fn authenticate(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<AccessToken, BackupError> {
        tracing::info!(
            token_url = %credentials.token_url,
            client_id = %credentials.client_id,
            "Requesting access token"
        );
        let body = TokenRequest {
            grant_type: "client_credentials",
            client_id: &credentials.client_id,
            client_secret: &credentials.client_secret,
        };

        let response = self
            .http
            .post(&credentials.token_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "Token endpoint unreachable");
                BackupError::Authentication(format!("token request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Token endpoint returned error. Response body: {text}");
            return Err(BackupError::Authentication(format!(
                "token endpoint returned {status}"
            )));
        }

        let parsed: TokenResponse = response.json().await.map_err(|e| {
            BackupError::Authentication(format!("token response is not valid JSON: {e}"))
        })?;
        match parsed.access_token {
            Some(token) if !token.is_empty() => {
                tracing::info!("Access token received");
                Ok(AccessToken::new(token))
            }
            _ => Err(BackupError::Authentication(
                "token response lacks `access_token`".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ContentSource for MarketingCloudClient {
    async fn fetch_modified_since(
        &self,
        token: &AccessToken,
        content_url: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ContentAsset>, BackupError> {
        let filter = modified_since_filter(since);
        tracing::info!(url = %content_url, %filter, "Querying content assets");

        let response = self
            .http
            .get(content_url)
            .bearer_auth(token.secret())
            .query(&[("$filter", filter.as_str())])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, url = %content_url, "Content endpoint unreachable");
                BackupError::Fetch(format!("content request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(%status, url = %content_url, "Content endpoint returned error. Response body: {text}");
            return Err(BackupError::Fetch(format!(
                "content endpoint returned {status}"
            )));
        }

        let page: ContentPage = response
            .json()
            .await
            .map_err(|e| BackupError::Fetch(format!("content response is not valid JSON: {e}")))?;
        let items = page
            .items
            .ok_or_else(|| BackupError::Fetch("content response lacks `items`".to_string()))?;

        items.into_iter().map(ContentAsset::try_from).collect()
    }
}
