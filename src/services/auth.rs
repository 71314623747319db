// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth facade: login flows, logout and authenticated requests.
//!
//! This is what the application talks to. It owns the session store and
//! an API client bound to it.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::models::{AuthState, Credentials, LoginPayload, OAuthCallback, Registration, Role, Session, UserProfile};
use crate::services::api_client::{ApiClient, ApiResponse};
use crate::services::session_store::SessionStore;
use crate::services::transport::{Method, RequestBody, Transport};
use crate::storage::SessionStorage;

#[derive(Clone)]
pub struct AuthService {
    store: Arc<SessionStore>,
    client: ApiClient,
}

impl AuthService {
    pub fn new(store: Arc<SessionStore>) -> Self {
        let client = ApiClient::new(store.clone());
        Self { store, client }
    }

    /// Build the store from its parts and restore any persisted session.
    pub fn from_config(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::new(SessionStore::restore(config, storage, transport))
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn state(&self) -> AuthState {
        self.store.state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.store.user()
    }

    pub fn role(&self) -> Option<Role> {
        self.store.role()
    }

    /// Establish a session from an already obtained payload.
    pub fn login(&self, payload: LoginPayload) -> Session {
        self.store.login(payload)
    }

    /// Exchange email and password for a session.
    ///
    /// The loading flag is raised for the duration; on failure the error
    /// message is recorded in the auth state and returned.
    pub async fn login_with_credentials(&self, credentials: &Credentials) -> Result<Session> {
        self.store.begin_login();
        match self.client.login(credentials).await {
            Ok(payload) => Ok(self.store.login(payload)),
            Err(e) => {
                tracing::info!(status = e.status(), "Login failed");
                self.store.fail_login(e.message());
                Err(e)
            }
        }
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, registration: &Registration) -> Result<ApiResponse> {
        let response = self.client.register(registration).await?;
        tracing::info!(username = %registration.username, "Account registered");
        Ok(response)
    }

    /// URL that starts the Google sign-in redirect.
    pub fn google_login_url(&self) -> String {
        self.client.google_login_url()
    }

    /// Finish the OAuth redirect from its query string.
    pub fn complete_oauth_callback(&self, query: &str) -> Result<Session> {
        match OAuthCallback::from_query(query) {
            Ok(callback) => Ok(self.store.login(callback.into_payload())),
            Err(e) => {
                tracing::warn!(error = %e, "OAuth callback rejected");
                self.store.fail_login(e.message());
                Err(e)
            }
        }
    }

    /// Tell the backend, then clear the local session regardless.
    pub async fn logout(&self) -> bool {
        if self.store.is_authenticated() {
            if let Err(e) = self.client.logout_remote().await {
                tracing::info!(error = %e, "Remote logout failed, clearing local session anyway");
            }
        }
        self.store.logout()
    }

    pub fn clear_error(&self) {
        self.store.clear_error();
    }

    /// Refresh the token now, outside the schedule.
    pub async fn refresh_now(&self) -> Result<()> {
        if !self.store.is_authenticated() {
            return Err(ClientError::NoSession);
        }
        self.store
            .refresh_shared(None)
            .await
            .map(|_| ())
            .map_err(|e| {
                tracing::warn!(error = %e, "Manual token refresh failed");
                ClientError::Unauthorized(e.to_string())
            })
    }

    /// Authenticated API call. See [`ApiClient::request`].
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<RequestBody>,
    ) -> Result<ApiResponse> {
        self.client.request(path, method, body).await
    }
}
