//! Session model and its persisted snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;
use super::user::UserProfile;

/// Authenticated identity and credential for one session.
///
/// A `Session` is always complete: user, token and role are set together.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: UserProfile,
    pub access_token: String,
    pub role: Role,
    /// Lifetime hint for `access_token`, in seconds
    pub expires_in_secs: i64,
    /// When the session was established (login or restore)
    pub established_at: DateTime<Utc>,
    /// When the token was last replaced by a refresh
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session from a login payload, normalizing the role.
    ///
    /// The payload role wins over the role embedded in the user record.
    pub fn from_payload(payload: LoginPayload, default_expires_in_secs: i64) -> Self {
        let role = payload
            .role
            .or_else(|| payload.user.role.clone())
            .map(Role::from)
            .unwrap_or_else(|| {
                tracing::warn!(user_id = %payload.user.id, "Login payload has no role, treating as listener");
                Role::Listener
            });

        Self {
            user: payload.user,
            access_token: payload.access_token,
            role,
            expires_in_secs: payload.expires_in.unwrap_or(default_expires_in_secs),
            established_at: Utc::now(),
            refreshed_at: None,
        }
    }

    /// Snapshot written to session storage.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            access_token: self.access_token.clone(),
            user_details: self.user.clone(),
            role: self.role,
            expires_in_seconds: Some(self.expires_in_secs),
        }
    }

    /// Shortened token for log fields.
    pub fn token_hint(&self) -> String {
        token_hint(&self.access_token)
    }
}

/// Abbreviate a bearer token so it can be logged.
pub fn token_hint(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{}…", prefix)
}

/// Input to `SessionStore::login`.
///
/// Accepts both the backend login response (`access_token`,
/// `userDetails`, `expires_in`) and the camelCase form used by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginPayload {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(alias = "userDetails", alias = "user_details")]
    pub user: UserProfile,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "expiresInSeconds", alias = "expires_in_seconds")]
    pub expires_in: Option<i64>,
}

impl LoginPayload {
    pub fn new(access_token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            access_token: access_token.into(),
            user,
            role: None,
            expires_in: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_expires_in(mut self, secs: i64) -> Self {
        self.expires_in = Some(secs);
        self
    }
}

/// Serialized form kept in the `userDetails` storage slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(alias = "access_token")]
    pub access_token: String,
    pub user_details: UserProfile,
    pub role: Role,
    #[serde(default, alias = "expires_in", skip_serializing_if = "Option::is_none")]
    pub expires_in_seconds: Option<i64>,
}

impl SessionSnapshot {
    /// Rebuild a session, rejecting snapshots without a usable token.
    pub fn into_session(self, default_expires_in_secs: i64) -> Option<Session> {
        if self.access_token.trim().is_empty() {
            return None;
        }
        Some(Session {
            user: self.user_details,
            access_token: self.access_token,
            role: self.role,
            expires_in_secs: self.expires_in_seconds.unwrap_or(default_expires_in_secs),
            established_at: Utc::now(),
            refreshed_at: None,
        })
    }
}

/// Observable authentication state, as consumed by the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub session: Option<Session>,
    /// A credential exchange is in progress
    pub loading: bool,
    /// Last login error, until cleared
    pub error: Option<String>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn role(&self) -> Option<Role> {
        self.session.as_ref().map(|s| s.role)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_payload_accepts_backend_shape() {
        let payload: LoginPayload = serde_json::from_value(json!({
            "access_token": "t1",
            "userDetails": {"id": 7, "email": "host@example.com", "role": "Speaker"},
            "expires_in": 900
        }))
        .unwrap();

        let session = Session::from_payload(payload, 1800);
        assert_eq!(session.access_token, "t1");
        assert_eq!(session.role, Role::Speaker);
        assert_eq!(session.expires_in_secs, 900);
    }

    #[test]
    fn payload_role_overrides_user_role_and_default_lifetime_applies() {
        let user = UserProfile::new("1", "a@example.com").with_role("Listener");
        let payload = LoginPayload::new("t1", user).with_role("Superuser");

        let session = Session::from_payload(payload, 1800);
        assert_eq!(session.role, Role::Admin);
        assert_eq!(session.expires_in_secs, 1800);
    }

    #[test]
    fn snapshot_uses_camel_case_layout() {
        let user = UserProfile::new("1", "a@example.com").with_username("alice");
        let session = Session::from_payload(
            LoginPayload::new("t1", user).with_role("admin").with_expires_in(600),
            1800,
        );

        let value = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(value["accessToken"], "t1");
        assert_eq!(value["role"], "admin");
        assert_eq!(value["expiresInSeconds"], 600);
        assert_eq!(value["userDetails"]["username"], "alice");
    }

    #[test]
    fn snapshot_with_blank_token_is_rejected() {
        let snapshot = SessionSnapshot {
            access_token: "  ".into(),
            user_details: UserProfile::new("1", "a@example.com"),
            role: Role::Listener,
            expires_in_seconds: None,
        };
        assert!(snapshot.into_session(1800).is_none());
    }

    #[test]
    fn token_hint_does_not_leak_full_token() {
        assert_eq!(token_hint("abcdefghijkl"), "abcdef…");
    }
}
