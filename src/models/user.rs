//! User profile as returned by the StreamVoice backend.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Profile of the authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Backend user ID (numeric IDs are kept as their decimal string)
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Email address
    pub email: String,
    /// Login handle
    #[serde(default)]
    pub username: Option<String>,
    /// Name shown in the UI
    #[serde(
        default,
        alias = "displayName",
        alias = "full_name",
        alias = "name",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    /// Raw role string as sent by the backend, before normalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Any other profile fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            username: None,
            display_name: None,
            role: None,
            extra: Map::new(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for id, got {}",
            other
        ))),
    }
}
