use chrono::NaiveDate;
use tracing::{error, info};

use crate::asset::ContentAsset;
use crate::contract::BackupStore;
use crate::error::BackupError;

/// Folder shared by every object of one run: `<prefix><DDMMYY>/`.
pub fn backup_folder(path_prefix: &str, run_date: NaiveDate) -> String {
    format!("{path_prefix}{}/", run_date.format("%d%m%y"))
}

pub fn object_key(folder: &str, asset: &ContentAsset) -> String {
    format!("{folder}{}.json", asset.id())
}

/// Write each asset as its own JSON object and return the keys written.
///
/// Writes happen one after the other. The first failure stops the loop;
/// objects written before it stay in the bucket.
pub async fn archive<S>(
    assets: &[ContentAsset],
    store: &S,
    path_prefix: &str,
    run_date: NaiveDate,
) -> Result<Vec<String>, BackupError>
where
    S: BackupStore + ?Sized,
{
    let folder = backup_folder(path_prefix, run_date);
    info!(bucket = %store.bucket(), %folder, assets = assets.len(), "[ARCHIVE] Writing backup objects");

    let mut written = Vec::with_capacity(assets.len());
    for asset in assets {
        let key = object_key(&folder, asset);
        let body = asset.to_pretty_json().map_err(|e| BackupError::Storage {
            key: key.clone(),
            reason: format!("could not serialize asset: {e}"),
        })?;
        if let Err(e) = store.put_object(&key, body).await {
            error!(%key, error = %e, written = written.len(), "[ARCHIVE][ERROR] Write failed, stopping");
            return Err(e);
        }
        info!(%key, "[ARCHIVE] Uploaded");
        written.push(key);
    }
    Ok(written)
}
