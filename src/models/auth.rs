//! Request and response bodies for the auth endpoints.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::session::LoginPayload;
use super::user::UserProfile;
use crate::error::ClientError;

/// Email/password pair sent to `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Sign-up form sent to `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct Registration {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

/// Password rules enforced before a registration is sent.
fn validate_password(password: &str) -> Result<(), ValidationError> {
    const SPECIAL: &str = "!@#$%^&*(),.?\":{}|<>";

    let failure = if password.chars().count() < 8 {
        Some(("password_length", "Password must be at least 8 characters"))
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some(("password_digit", "Password must include at least one number"))
    } else if !password.chars().any(|c| SPECIAL.contains(c)) {
        Some((
            "password_special",
            "Password must include at least one special character",
        ))
    } else if password
        .chars()
        .any(|c| ('\u{1F300}'..='\u{1F77F}').contains(&c))
    {
        Some(("password_charset", "Password contains invalid characters"))
    } else {
        None
    };

    match failure {
        Some((code, message)) => {
            let mut err = ValidationError::new(code);
            err.message = Some(message.into());
            Err(err)
        }
        None => Ok(()),
    }
}

/// Run `validator` checks and map failures onto [`ClientError::Validation`].
pub fn check<T: Validate>(input: &T) -> Result<(), ClientError> {
    input
        .validate()
        .map_err(|errors| ClientError::Validation(errors.to_string()))
}

/// Body returned by `POST /auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "expiresIn", alias = "expires_in_seconds")]
    pub expires_in: Option<i64>,
}

/// Token and user handed back by the OAuth redirect.
#[derive(Debug, Clone)]
pub struct OAuthCallback {
    pub token: String,
    pub user: UserProfile,
}

impl OAuthCallback {
    /// Parse a redirect query string such as `?token=...&user=%7B...%7D`.
    pub fn from_query(query: &str) -> Result<Self, ClientError> {
        let mut token = None;
        let mut user_json = None;

        for pair in query.trim_start_matches('?').split('&') {
            let (key, value) = match pair.split_once('=') {
                Some(kv) => kv,
                None => continue,
            };
            let value = urlencoding::decode(&value.replace('+', " "))
                .map_err(|e| ClientError::Validation(format!("Bad query encoding: {}", e)))?
                .into_owned();
            match key {
                "token" => token = Some(value),
                "user" => user_json = Some(value),
                _ => {}
            }
        }

        let (token, user_json) = match (token, user_json) {
            (Some(t), Some(u)) if !t.is_empty() && !u.is_empty() => (t, u),
            _ => {
                return Err(ClientError::Validation(
                    "Missing token or user data in callback".to_string(),
                ))
            }
        };

        let user: UserProfile = serde_json::from_str(&user_json)
            .map_err(|e| ClientError::Validation(format!("Malformed user data: {}", e)))?;

        Ok(Self { token, user })
    }

    /// Login payload equivalent to a credential login.
    pub fn into_payload(self) -> LoginPayload {
        let role = self.user.role.clone();
        LoginPayload {
            access_token: self.token,
            user: self.user,
            role,
            expires_in: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_email_and_password() {
        assert!(check(&Credentials::new("host@example.com", "pw")).is_ok());
        assert!(matches!(
            check(&Credentials::new("not-an-email", "pw")),
            Err(ClientError::Validation(_))
        ));
        assert!(check(&Credentials::new("host@example.com", "")).is_err());
    }

    #[test]
    fn registration_password_rules() {
        let mut reg = Registration {
            username: "host".into(),
            email: "host@example.com".into(),
            password: "short1!".into(),
        };
        let err = check(&reg).unwrap_err();
        assert!(err.to_string().contains("at least 8 characters"));

        reg.password = "longenough!".into();
        assert!(check(&reg).unwrap_err().to_string().contains("number"));

        reg.password = "longenough1".into();
        assert!(check(&reg).unwrap_err().to_string().contains("special"));

        reg.password = "longenough1!".into();
        assert!(check(&reg).is_ok());
    }

    #[test]
    fn parses_oauth_callback_query() {
        let user = r#"{"id":"u9","email":"g@example.com","role":"Speaker"}"#;
        let query = format!("?token=abc123&user={}", urlencoding::encode(user));

        let callback = OAuthCallback::from_query(&query).unwrap();
        assert_eq!(callback.token, "abc123");
        assert_eq!(callback.user.id, "u9");

        let payload = callback.into_payload();
        assert_eq!(payload.role.as_deref(), Some("Speaker"));
    }

    #[test]
    fn callback_without_user_is_rejected() {
        assert!(OAuthCallback::from_query("token=abc").is_err());
        assert!(OAuthCallback::from_query("token=abc&user=%7Bnot-json").is_err());
    }
}
