// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: single source of truth for the current session.
//!
//! Handles:
//! - Login / logout and the persisted `userDetails` snapshot
//! - Restoring a session after restart (corrupt snapshots mean logged out)
//! - Proactive refresh, scheduled a safety margin before expiry
//! - The shared refresh protocol used by both the timer and the API client

use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::config::{ClientConfig, RefreshFailurePolicy};
use crate::error::RefreshError;
use crate::models::session::token_hint;
use crate::models::{AuthState, LoginPayload, RefreshResponse, Role, Session, SessionSnapshot, UserProfile};
use crate::services::refresh::{RefreshCoordinator, RefreshOutcome, RefreshedToken};
use crate::services::timer::RefreshTimer;
use crate::services::transport::{ApiRequest, Method, Transport};
use crate::storage::{keys, SessionStorage};
use crate::time_utils;

/// Path of the refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "auth/refresh";

/// Holds the session for one client and keeps its token fresh.
///
/// Always used behind an `Arc`; the refresh timer holds a weak reference
/// back to the store.
pub struct SessionStore {
    me: Weak<SessionStore>,
    config: ClientConfig,
    storage: Arc<dyn SessionStorage>,
    transport: Arc<dyn Transport>,
    state: RwLock<AuthState>,
    timer: Arc<RefreshTimer>,
    refresh: RefreshCoordinator,
}

impl SessionStore {
    /// Create an empty (logged out) store.
    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            config,
            storage,
            transport,
            state: RwLock::new(AuthState::default()),
            timer: RefreshTimer::new(),
            refresh: RefreshCoordinator::new(),
        })
    }

    /// Create a store and restore any persisted session.
    pub fn restore(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        let store = Self::new(config, storage, transport);
        store.restore_from_storage();
        store
    }

    /// Stop background work. The session itself is left untouched.
    pub fn dispose(&self) {
        if self.timer.cancel() {
            tracing::debug!("Refresh timer cancelled on dispose");
        }
    }

    // ─── Accessors ───────────────────────────────────────────────

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Snapshot of the observable auth state.
    pub fn state(&self) -> AuthState {
        self.state.read().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.read().session.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.read().user().cloned()
    }

    pub fn role(&self) -> Option<Role> {
        self.state.read().role()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.read().access_token().map(str::to_string)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    /// Refresh calls issued so far (timer and 401-triggered alike).
    pub fn refreshes_started(&self) -> u64 {
        self.refresh.refreshes_started()
    }

    /// Delay the pending proactive refresh was scheduled with.
    pub fn scheduled_refresh_delay(&self) -> Option<Duration> {
        self.timer.pending_delay()
    }

    /// When the pending proactive refresh is due.
    pub fn next_refresh_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.timer.deadline()
    }

    // ─── Login state flags ───────────────────────────────────────

    /// A credential exchange has started.
    pub fn begin_login(&self) {
        let mut state = self.state.write();
        state.loading = true;
        state.error = None;
    }

    /// A credential exchange failed; the existing session is left as is.
    pub fn fail_login(&self, message: impl Into<String>) {
        let mut state = self.state.write();
        state.loading = false;
        state.error = Some(message.into());
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    // ─── Lifecycle ───────────────────────────────────────────────

    /// Establish a session, replacing any existing one.
    pub fn login(&self, payload: LoginPayload) -> Session {
        let session = Session::from_payload(payload, self.config.default_expires_in_secs);
        {
            let mut state = self.state.write();
            state.session = Some(session.clone());
            state.loading = false;
            state.error = None;
        }
        self.persist(&session);

        tracing::info!(
            user_id = %session.user.id,
            role = %session.role,
            expires_in = session.expires_in_secs,
            "Session established"
        );

        self.schedule_refresh(session.expires_in_secs);
        session
    }

    /// Clear the session, its snapshot and the refresh timer. Idempotent.
    ///
    /// Returns whether a session was actually cleared.
    pub fn logout(&self) -> bool {
        self.timer.cancel();

        let previous = {
            let mut state = self.state.write();
            state.loading = false;
            state.error = None;
            state.session.take()
        };

        match previous {
            Some(session) => {
                self.clear_snapshot();
                tracing::info!(user_id = %session.user.id, "Session cleared");
                true
            }
            None => {
                tracing::debug!("Logout with no active session");
                false
            }
        }
    }

    /// Load the persisted snapshot, if any. Never fails: unreadable or
    /// malformed snapshots are discarded and the store stays logged out.
    pub fn restore_from_storage(&self) -> bool {
        let raw = match self.storage.get_item(keys::USER_DETAILS) {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored session, treating as logged out");
                self.logout();
                return false;
            }
        };

        let restored = serde_json::from_str::<SessionSnapshot>(&raw)
            .ok()
            .and_then(|snapshot| snapshot.into_session(self.config.default_expires_in_secs));

        match restored {
            Some(session) => {
                self.timer.cancel();
                {
                    let mut state = self.state.write();
                    state.session = Some(session.clone());
                    state.loading = false;
                    state.error = None;
                }
                tracing::info!(
                    user_id = %session.user.id,
                    role = %session.role,
                    "Session restored from storage"
                );
                self.schedule_refresh(session.expires_in_secs);
                true
            }
            None => {
                tracing::warn!("Stored session is malformed, treating as logged out");
                self.logout();
                self.clear_snapshot();
                false
            }
        }
    }

    /// Schedule the proactive refresh `margin` seconds before expiry, or
    /// refresh right away when the token is already inside the margin.
    fn schedule_refresh(&self, expires_in_secs: i64) {
        let raw_delay = expires_in_secs.saturating_sub(self.config.refresh_margin_secs);
        let me = self.me.clone();
        let task = async move {
            if let Some(store) = me.upgrade() {
                store.refresh().await;
            }
        };

        if raw_delay < 0 {
            tracing::info!(expires_in = expires_in_secs, "Token inside refresh margin, refreshing now");
            self.timer.fire_now(task);
            return;
        }

        let delay = Duration::from_secs(raw_delay as u64);
        if self.timer.schedule(delay, task) {
            if let Some(deadline) = self.timer.deadline() {
                tracing::debug!(
                    delay_secs = raw_delay,
                    due = %time_utils::format_utc_rfc3339(deadline),
                    "Token refresh scheduled"
                );
            }
        }
    }

    // ─── Refresh protocol ────────────────────────────────────────

    /// Background refresh. Failure is logged and, under the default
    /// policy, the stale token stays in place.
    pub async fn refresh(&self) -> bool {
        if !self.is_authenticated() {
            tracing::debug!("No session, skipping token refresh");
            return false;
        }
        match self.refresh_shared(None).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, keeping current session");
                false
            }
        }
    }

    /// Refresh through the single-flight guard.
    ///
    /// `used_token` is the token a caller was rejected with. If the session
    /// already holds a different token and no refresh is in flight, that
    /// token is returned without another refresh call.
    pub async fn refresh_shared(&self, used_token: Option<&str>) -> RefreshOutcome {
        let outcome = self
            .refresh
            .run_unless(
                || self.replaced_token(used_token),
                || self.start_refresh(),
            )
            .await;

        if outcome.is_err() && self.config.refresh_failure_policy == RefreshFailurePolicy::Logout {
            tracing::warn!("Refresh failed and policy requires logout");
            self.logout();
        }
        outcome
    }

    fn replaced_token(&self, used_token: Option<&str>) -> Option<RefreshedToken> {
        let used = used_token?;
        let state = self.state.read();
        let session = state.session.as_ref()?;
        (session.access_token != used).then(|| RefreshedToken {
            access_token: session.access_token.clone(),
            expires_in_secs: session.expires_in_secs,
        })
    }

    fn start_refresh(&self) -> BoxFuture<'static, RefreshOutcome> {
        let me = self.me.clone();
        async move {
            let store = me.upgrade().ok_or(RefreshError::NoSession)?;
            store.perform_refresh().await
        }
        .boxed()
    }

    /// One `POST /auth/refresh` round trip, applied to the session on success.
    async fn perform_refresh(&self) -> RefreshOutcome {
        let current = self.access_token().ok_or(RefreshError::NoSession)?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", current))
            .map_err(|_| RefreshError::InvalidResponse("Stored token is not a valid header".into()))?;
        headers.insert(AUTHORIZATION, bearer);

        let request = ApiRequest {
            method: Method::POST,
            path: REFRESH_PATH.to_string(),
            url: self.config.endpoint(REFRESH_PATH),
            headers,
            body: None,
        };

        tracing::info!(token = %token_hint(&current), "Refreshing access token");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        if !(200..300).contains(&response.status) {
            return Err(RefreshError::Rejected {
                status: response.status,
            });
        }

        let parsed: RefreshResponse = serde_json::from_str(&response.body)
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;
        if parsed.access_token.trim().is_empty() {
            return Err(RefreshError::InvalidResponse("Empty access token".into()));
        }

        let expires_in_secs = parsed
            .expires_in
            .unwrap_or(self.config.default_expires_in_secs);
        self.apply_refreshed(&current, parsed.access_token, expires_in_secs)
    }

    /// Swap in a refreshed token, unless the session changed meanwhile.
    fn apply_refreshed(
        &self,
        used_token: &str,
        access_token: String,
        expires_in_secs: i64,
    ) -> RefreshOutcome {
        let updated = {
            let mut state = self.state.write();
            let session = state.session.as_mut().ok_or_else(|| {
                tracing::info!("Session ended during refresh, discarding token");
                RefreshError::NoSession
            })?;

            if session.access_token != used_token {
                tracing::info!("Session replaced during refresh, discarding token");
                return Ok(RefreshedToken {
                    access_token: session.access_token.clone(),
                    expires_in_secs: session.expires_in_secs,
                });
            }

            session.access_token = access_token;
            session.expires_in_secs = expires_in_secs;
            session.refreshed_at = Some(chrono::Utc::now());
            session.clone()
        };

        self.persist(&updated);
        tracing::info!(
            user_id = %updated.user.id,
            token = %updated.token_hint(),
            expires_in = expires_in_secs,
            "Access token refreshed"
        );
        self.schedule_refresh(expires_in_secs);

        Ok(RefreshedToken {
            access_token: updated.access_token,
            expires_in_secs,
        })
    }

    // ─── Persistence ─────────────────────────────────────────────

    fn persist(&self, session: &Session) {
        let result = serde_json::to_string(&session.snapshot())
            .map_err(Into::into)
            .and_then(|json| self.storage.set_item(keys::USER_DETAILS, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist session snapshot");
        }
    }

    fn clear_snapshot(&self) {
        if let Err(e) = self.storage.remove_item(keys::USER_DETAILS) {
            tracing::warn!(error = %e, "Failed to clear session snapshot");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.timer.cancel();
    }
}
