use serde::Deserialize;

/// Profile document from the `users` collection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "$id")]
    pub id: String,
    pub email: String,
    #[serde(rename = "fullName", default)]
    pub full_name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(rename = "accountId", default)]
    pub account_id: Option<String>,
}
