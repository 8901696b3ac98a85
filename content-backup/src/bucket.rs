use async_trait::async_trait;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use tokio::sync::OnceCell;

use content_backup_core::contract::BackupStore;
use content_backup_core::BackupError;

/// Writes backup objects into any `object_store` backend.
///
/// The GCS client is built on the first write, so a run with nothing to
/// archive never reads cloud credentials.
pub struct ObjectStoreBackupStore {
    store: OnceCell<Box<dyn ObjectStore>>,
    bucket: String,
}

impl std::fmt::Debug for ObjectStoreBackupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreBackupStore")
            .field("bucket", &self.bucket)
            .field("connected", &self.store.initialized())
            .finish_non_exhaustive()
    }
}

impl ObjectStoreBackupStore {
    /// Google Cloud Storage bucket with credentials taken from the environment
    /// (`GOOGLE_SERVICE_ACCOUNT`, `GOOGLE_APPLICATION_CREDENTIALS`, ...).
    pub fn for_gcs_bucket(bucket: &str) -> Self {
        ObjectStoreBackupStore {
            store: OnceCell::new(),
            bucket: bucket.to_string(),
        }
    }

    /// Wrap an existing store, e.g. `object_store::memory::InMemory` in tests.
    pub fn new(store: Box<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        ObjectStoreBackupStore {
            store: OnceCell::from(store),
            bucket: bucket.into(),
        }
    }

    /// The backend, once it has been built.
    pub fn inner(&self) -> Option<&dyn ObjectStore> {
        self.store.get().map(|store| store.as_ref())
    }

    async fn connect(&self) -> Result<&dyn ObjectStore, BackupError> {
        let store = self
            .store
            .get_or_try_init(|| async {
                let gcs = object_store::gcp::GoogleCloudStorageBuilder::from_env()
                    .with_bucket_name(&self.bucket)
                    .build()
                    .map_err(|e| BackupError::Storage {
                        key: format!("gs://{}", self.bucket),
                        reason: format!("building GCS client: {e}"),
                    })?;
                tracing::info!(bucket = %self.bucket, "Initialized GCS backup store from environment");
                Ok::<Box<dyn ObjectStore>, BackupError>(Box::new(gcs))
            })
            .await?;
        Ok(store.as_ref())
    }
}

#[async_trait]
impl BackupStore for ObjectStoreBackupStore {
    fn bucket(&self) -> String {
        self.bucket.clone()
    }

    async fn put_object(&self, key: &str, body: String) -> Result<(), BackupError> {
        // `Path::from` would percent-encode characters such as `#` or `~`;
        // the object must land under exactly the key that gets reported.
        let path = Path::parse(key).map_err(|e| {
            tracing::error!(error = %e, bucket = %self.bucket, %key, "Object key rejected");
            BackupError::Storage {
                key: key.to_string(),
                reason: format!("invalid object key: {e}"),
            }
        })?;
        let store = self.connect().await?;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, "application/json".into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };
        store
            .put_opts(&path, PutPayload::from(body.into_bytes()), opts)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, bucket = %self.bucket, %key, "Object write failed");
                BackupError::Storage {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;
        Ok(())
    }
}
