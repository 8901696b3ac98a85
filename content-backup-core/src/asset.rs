//! Content assets as returned by the marketing API.
//!
//! An asset is kept as the raw JSON object it arrived as. The only field the
//! pipeline looks at is `id`, which names the backup object.

use serde_json::{Map, Value};

use crate::error::BackupError;

#[derive(Debug, Clone, PartialEq)]
pub struct ContentAsset {
    id: String,
    fields: Map<String, Value>,
}

impl ContentAsset {
    /// Identifier rendered as text. Integer ids print without quotes.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Pretty-printed JSON body written to storage.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.fields)
    }
}

impl TryFrom<Value> for ContentAsset {
    type Error = BackupError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(fields) = value else {
            return Err(BackupError::Fetch(format!(
                "content item is not a JSON object: {value}"
            )));
        };
        let id = match fields.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(BackupError::Fetch(format!(
                    "content item has an unusable id: {other}"
                )))
            }
            None => {
                return Err(BackupError::Fetch(
                    "content item is missing the `id` field".to_string(),
                ))
            }
        };
        Ok(ContentAsset { id, fields })
    }
}
