use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::file_type::FileType;

/// File metadata as stored in the `files` collection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub extension: String,
    pub size: u64,
    #[serde(deserialize_with = "reference_id")]
    pub owner: String,
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(default, deserialize_with = "shared_with")]
    pub users: Vec<String>,
    #[serde(rename = "bucketFileId")]
    pub bucket_file_id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "$updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn from_document(doc: Value) -> anyhow::Result<Self> {
        let id = doc
            .get("$id")
            .and_then(Value::as_str)
            .unwrap_or("<missing id>")
            .to_string();
        serde_json::from_value(doc).with_context(|| format!("invalid file document {id}"))
    }

    pub fn is_shared_with(&self, email: &str) -> bool {
        self.users.iter().any(|u| u == email)
    }
}

/// Body written when a file document is created.
#[derive(Debug, Clone)]
pub struct NewFileDocument {
    pub file_type: FileType,
    pub name: String,
    pub url: String,
    pub extension: String,
    pub size: u64,
    pub owner: String,
    pub account_id: String,
    pub users: Vec<String>,
    pub bucket_file_id: String,
}

impl NewFileDocument {
    pub fn into_value(self) -> Value {
        serde_json::json!({
            "type": self.file_type.as_str(),
            "name": self.name,
            "url": self.url,
            "extension": self.extension,
            "size": self.size,
            "owner": self.owner,
            "accountId": self.account_id,
            "users": encode_shared_with(&self.users),
            "bucketFileId": self.bucket_file_id,
        })
    }
}

// The `users` attribute is typed as scalar text in the collection schema, so the
// list travels as a JSON string. Older records may already carry a real array.
pub fn parse_shared_with(value: &Value) -> Vec<String> {
    match value {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => strings_of(&items),
            _ => Vec::new(),
        },
        Value::Array(items) => strings_of(&items),
        _ => Vec::new(),
    }
}

pub fn encode_shared_with(emails: &[String]) -> String {
    Value::from(emails.to_vec()).to_string()
}

fn strings_of(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|v| v.as_str().map(str::to_owned))
        .collect()
}

fn shared_with<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().map(parse_shared_with).unwrap_or_default())
}

// Relationship attributes come back either as a bare id or as the expanded document.
fn reference_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Object(map) => match map.get("$id") {
            Some(Value::String(id)) => Ok(id.clone()),
            _ => Err(serde::de::Error::custom("related document without $id")),
        },
        other => Err(serde::de::Error::custom(format!(
            "expected id or document, got {other}"
        ))),
    }
}
