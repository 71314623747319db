// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resilient StreamVoice API client.
//!
//! Handles:
//! - Bearer and identity headers, read fresh from the session per attempt
//! - 401 recovery through the shared single-flight refresh
//! - Bounded retry with linear backoff for 5xx and transport failures
//! - Unauthenticated credential exchange (login, register) with no retry

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{ClientError, Result};
use crate::models::auth::check;
use crate::models::{Credentials, LoginPayload, Registration};
use crate::services::session_store::SessionStore;
use crate::services::transport::{ApiRequest, FormPayload, Method, RawResponse, RequestBody, TransportError};

pub const LOGIN_PATH: &str = "auth/login";
pub const REGISTER_PATH: &str = "auth/register";
pub const LOGOUT_PATH: &str = "auth/logout";
pub const GOOGLE_LOGIN_PATH: &str = "auth/google/login";

/// Identity hint headers sent with every authenticated call.
pub mod identity_headers {
    pub const USER_ID: &str = "userid";
    pub const USER_EMAIL: &str = "useremail";
    pub const USER_ROLE: &str = "userrole";
    pub const USERNAME: &str = "username";
}

/// Statuses treated as success.
const SUCCESS_STATUSES: [u16; 2] = [200, 201];

/// Successful API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `Null` when the body was empty or not JSON
    pub data: Value,
}

/// How one attempt ended.
enum Outcome {
    Success(ApiResponse),
    Application { status: u16, message: String },
    Unauthorized,
    Transient(String),
}

fn classify(result: std::result::Result<RawResponse, TransportError>, had_token: bool) -> Outcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => return Outcome::Transient(e.to_string()),
    };

    match response.status {
        status if SUCCESS_STATUSES.contains(&status) => Outcome::Success(ApiResponse {
            status,
            data: response.json_body().unwrap_or(Value::Null),
        }),
        // Without a token there is nothing to refresh.
        401 if had_token => Outcome::Unauthorized,
        status if status >= 500 => Outcome::Transient(format!("HTTP {}", status)),
        status => Outcome::Application {
            status,
            message: response
                .error_message()
                .unwrap_or_else(|| ClientError::UNKNOWN_ERROR.to_string()),
        },
    }
}

/// API client bound to a session store.
#[derive(Clone)]
pub struct ApiClient {
    store: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// URL the browser is sent to for Google sign-in.
    pub fn google_login_url(&self) -> String {
        self.store.config().endpoint(GOOGLE_LOGIN_PATH)
    }

    // ─── Authenticated calls ─────────────────────────────────────

    /// Perform an authenticated call with coordinated refresh and retry.
    ///
    /// 401 recovery and transient failures each get their own budget of
    /// `max_retries` retries, so 5xx responses never use up the retries a
    /// later 401 needs for its refresh.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<RequestBody>,
    ) -> Result<ApiResponse> {
        let config = self.store.config();
        let mut auth_retries: u32 = 0;
        let mut transient_retries: u32 = 0;

        loop {
            let request = self.build_request(path, &method, body.as_ref());
            let used_token = request.bearer_token().map(str::to_string);

            let result = self.store.transport().send(request).await;
            match classify(result, used_token.is_some()) {
                Outcome::Success(response) => {
                    tracing::debug!(
                        path,
                        status = response.status,
                        auth_retries,
                        transient_retries,
                        "API call succeeded"
                    );
                    return Ok(response);
                }
                Outcome::Application { status, message } => {
                    tracing::debug!(path, status, message = %message, "API call rejected");
                    return Err(ClientError::Api { status, message });
                }
                Outcome::Unauthorized => {
                    if auth_retries >= config.max_retries {
                        tracing::warn!(path, retries = auth_retries, "Authorization retries exhausted");
                        return Err(ClientError::Unauthorized(ClientError::TRY_AGAIN.to_string()));
                    }
                    auth_retries += 1;
                    match self.store.refresh_shared(used_token.as_deref()).await {
                        Ok(_) => tracing::debug!(path, retry = auth_retries, "Retrying with refreshed token"),
                        Err(e) => tracing::info!(
                            path,
                            retry = auth_retries,
                            error = %e,
                            "Token refresh failed, retrying original request"
                        ),
                    }
                }
                Outcome::Transient(reason) => {
                    if transient_retries >= config.max_retries {
                        tracing::error!(path, retries = transient_retries, reason = %reason, "API call failed after retries");
                        return Err(ClientError::Unavailable(ClientError::NETWORK_ERROR.to_string()));
                    }
                    transient_retries += 1;
                    let delay = config.backoff_base * transient_retries;
                    tracing::info!(
                        path,
                        retry = transient_retries,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "Transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.request(path, Method::GET, None).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.request(path, Method::DELETE, None).await
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.request(path, Method::POST, Some(RequestBody::Json(to_json(body)?)))
            .await
    }

    pub async fn put_json<T: Serialize>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.request(path, Method::PUT, Some(RequestBody::Json(to_json(body)?)))
            .await
    }

    pub async fn post_form(&self, path: &str, form: FormPayload) -> Result<ApiResponse> {
        self.request(path, Method::POST, Some(RequestBody::Form(form)))
            .await
    }

    /// Tell the backend the session is over.
    pub async fn logout_remote(&self) -> Result<ApiResponse> {
        self.request(LOGOUT_PATH, Method::POST, Some(RequestBody::Json(serde_json::json!({}))))
            .await
    }

    /// Assemble one attempt, reading token and identity from the store now.
    fn build_request(&self, path: &str, method: &Method, body: Option<&RequestBody>) -> ApiRequest {
        let mut headers = HeaderMap::new();

        if let Some(session) = self.store.session() {
            if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", session.access_token)) {
                headers.insert(AUTHORIZATION, bearer);
            }

            let identity = [
                (identity_headers::USER_ID, Some(session.user.id.as_str())),
                (identity_headers::USER_EMAIL, Some(session.user.email.as_str())),
                (identity_headers::USER_ROLE, Some(session.role.as_str())),
                (identity_headers::USERNAME, session.user.username.as_deref()),
            ];
            for (name, value) in identity {
                let value = match value.filter(|v| !v.is_empty()) {
                    Some(v) => v,
                    None => continue,
                };
                match HeaderValue::from_str(value) {
                    Ok(value) => {
                        headers.insert(HeaderName::from_static(name), value);
                    }
                    Err(_) => tracing::debug!(header = name, "Skipping identity header with invalid value"),
                }
            }
        }

        let body = if *method == Method::GET || *method == Method::DELETE {
            None
        } else {
            body.cloned()
        };

        ApiRequest {
            method: method.clone(),
            path: path.to_string(),
            url: self.store.config().endpoint(path),
            headers,
            body,
        }
    }

    // ─── Credential exchange ─────────────────────────────────────

    /// Exchange credentials for a login payload. No token, no retry.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginPayload> {
        check(credentials)?;
        let response = self.exchange(LOGIN_PATH, to_json(credentials)?).await?;
        serde_json::from_str(&response.body).map_err(|e| {
            ClientError::Internal(anyhow::anyhow!("Malformed login response: {}", e))
        })
    }

    /// Create an account. No token, no retry.
    pub async fn register(&self, registration: &Registration) -> Result<ApiResponse> {
        check(registration)?;
        let response = self.exchange(REGISTER_PATH, to_json(registration)?).await?;
        Ok(ApiResponse {
            status: response.status,
            data: response.json_body().unwrap_or(Value::Null),
        })
    }

    async fn exchange(&self, path: &str, body: Value) -> Result<RawResponse> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let request = ApiRequest {
            method: Method::POST,
            path: path.to_string(),
            url: self.store.config().endpoint(path),
            headers,
            body: Some(RequestBody::Json(body)),
        };

        let response = self.store.transport().send(request).await.map_err(|e| {
            tracing::warn!(path, error = %e, "Credential exchange failed");
            ClientError::Unavailable(ClientError::NETWORK_ERROR.to_string())
        })?;

        if SUCCESS_STATUSES.contains(&response.status) {
            Ok(response)
        } else {
            let message = response
                .error_message()
                .unwrap_or_else(|| ClientError::UNKNOWN_ERROR.to_string());
            tracing::info!(path, status = response.status, message = %message, "Credential exchange rejected");
            Err(ClientError::Api {
                status: response.status,
                message,
            })
        }
    }
}

fn to_json<T: Serialize>(body: &T) -> Result<Value> {
    serde_json::to_value(body)
        .map_err(|e| ClientError::Validation(format!("Body is not serializable: {}", e)))
}
