use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::BackupError;

/// The settings document, loaded once per run and never mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupConfig {
    pub salesforce: SalesforceSection,
    pub google_cloud: GoogleCloudSection,
    pub settings: SettingsSection,
}

/// Marketing API credentials and endpoints.
#[derive(Clone, Deserialize)]
pub struct SalesforceSection {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub content_url: String,
}

// The secret stays out of debug output and logs.
impl std::fmt::Debug for SalesforceSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceSection")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_url", &self.auth_url)
            .field("content_url", &self.content_url)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCloudSection {
    pub bucket_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingsSection {
    /// Prepended verbatim to the dated folder name, e.g. `sfmc-backups/`.
    pub backup_prefix: String,
    /// Fetch cutoff used when no run marker exists yet.
    #[serde(default)]
    pub initial_since: Option<DateTime<Utc>>,
}

/// Credentials handed to an [`Authenticator`](crate::contract::Authenticator).
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url)
            .finish()
    }
}

impl BackupConfig {
    /// Rejects empty values for every required key.
    pub fn validate(&self) -> Result<(), BackupError> {
        let required = [
            ("salesforce.client_id", &self.salesforce.client_id),
            ("salesforce.client_secret", &self.salesforce.client_secret),
            ("salesforce.auth_url", &self.salesforce.auth_url),
            ("salesforce.content_url", &self.salesforce.content_url),
            ("google_cloud.bucket_name", &self.google_cloud.bucket_name),
            ("settings.backup_prefix", &self.settings.backup_prefix),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(BackupError::Configuration(format!(
                    "required key `{key}` is empty"
                )));
            }
        }
        Ok(())
    }

    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials {
            client_id: self.salesforce.client_id.clone(),
            client_secret: self.salesforce.client_secret.clone(),
            token_url: self.salesforce.auth_url.clone(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            auth_url = %self.salesforce.auth_url,
            content_url = %self.salesforce.content_url,
            bucket = %self.google_cloud.bucket_name,
            backup_prefix = %self.settings.backup_prefix,
            initial_since = ?self.settings.initial_since,
            "Loaded BackupConfig"
        );
        debug!(?self, "BackupConfig loaded (full debug)");
    }
}
