// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Platform roles.
//!
//! The backend has used several spellings for the same role over time
//! (`admin`, `Superuser`, `Speaker`, `Listener`). Every raw string passes
//! through [`Role::normalize`] exactly once, when a session is created, and
//! only the canonical enum travels further.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    Admin,
    Speaker,
    Listener,
}

impl Role {
    /// Map a raw backend role string onto the canonical vocabulary.
    ///
    /// Matching is case-insensitive and `superuser` is treated as `admin`.
    /// Returns `None` for anything unrecognized.
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" | "superuser" | "administrator" => Some(Role::Admin),
            "speaker" => Some(Role::Speaker),
            "listener" => Some(Role::Listener),
            _ => None,
        }
    }

    /// Canonical lowercase name, as sent in the `userRole` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Speaker => "speaker",
            Role::Listener => "listener",
        }
    }
}

impl From<String> for Role {
    /// Unknown roles fall back to the least privileged one.
    fn from(raw: String) -> Self {
        Role::normalize(&raw).unwrap_or_else(|| {
            tracing::warn!(role = %raw, "Unrecognized role, treating as listener");
            Role::Listener
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_legacy_spellings() {
        assert_eq!(Role::normalize("Superuser"), Some(Role::Admin));
        assert_eq!(Role::normalize("admin"), Some(Role::Admin));
        assert_eq!(Role::normalize("Speaker"), Some(Role::Speaker));
        assert_eq!(Role::normalize(" LISTENER "), Some(Role::Listener));
        assert_eq!(Role::normalize("moderator"), None);
    }

    #[test]
    fn deserializes_any_casing_and_serializes_canonical() {
        let role: Role = serde_json::from_str("\"Speaker\"").unwrap();
        assert_eq!(role, Role::Speaker);
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"speaker\"");

        let unknown: Role = serde_json::from_str("\"guest\"").unwrap();
        assert_eq!(unknown, Role::Listener);
    }
}
