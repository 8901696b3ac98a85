//! # contract: the seams between the pipeline and the outside world
//!
//! The backup run talks to three external systems: the token endpoint, the
//! content endpoint and the storage bucket. Each one sits behind a trait here
//! so the orchestration in [`crate::synchronise`] can be driven by the real
//! HTTP/object-store clients in the CLI crate, or by `mockall` mocks in tests.
//!
//! ## Mocking & Testing
//! - Every trait is annotated with `automock`; the generated `Mock*` types are
//!   exported under the `test-export-mocks` feature (on by default) so that
//!   downstream crates can use them in their own tests.
//!
//! ## Errors
//! - All methods return [`BackupError`]; implementors map their transport
//!   errors onto the variant that matches the step (authentication, fetch,
//!   storage).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[allow(unused_imports)]
use mockall::{automock, predicate::*};

use crate::asset::ContentAsset;
use crate::config::ClientCredentials;
use crate::error::BackupError;

/// Short-lived bearer credential. Lives in memory for one run only.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        AccessToken(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken(<{} bytes>)", self.0.len())
    }
}

/// Exchanges client credentials for an [`AccessToken`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// One credential exchange against `credentials.token_url`. No retry.
    async fn authenticate(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<AccessToken, BackupError>;
}

/// Queries the content endpoint.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Every asset modified at or after `since`, in a single response.
    ///
    /// An empty list is a valid result. Items without an `id` are rejected.
    async fn fetch_modified_since(
        &self,
        token: &AccessToken,
        content_url: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ContentAsset>, BackupError>;
}

/// A writable bucket. One instance is bound to one bucket.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Name of the bucket, for logging.
    fn bucket(&self) -> String;

    /// Write `body` at `key`, replacing any existing object.
    async fn put_object(&self, key: &str, body: String) -> Result<(), BackupError>;
}
