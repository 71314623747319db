// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use streamvoice_session::config::ClientConfig;
use streamvoice_session::models::{LoginPayload, UserProfile};
use streamvoice_session::services::{
    ApiRequest, Method, RawResponse, RequestBody, SessionStore, Transport, TransportError,
};
use streamvoice_session::storage::{MemoryStorage, SessionStorage};
use tokio::time::Instant;

type Reply = Result<RawResponse, TransportError>;
type Handler = Arc<dyn Fn(&ApiRequest) -> Reply + Send + Sync>;

/// A request as the fake backend saw it.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub at: Instant,
}

/// Scripted in-process backend.
///
/// Each route (`"METHOD path"`) answers from its script queue first, then
/// from its handler. Unknown routes get a 404.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeBackend {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    handlers: Mutex<HashMap<String, Handler>>,
    delays: Mutex<HashMap<String, Duration>>,
    log: Mutex<Vec<Recorded>>,
}

#[allow(dead_code)]
fn route(method: &Method, path: &str) -> String {
    format!("{} {}", method, path)
}

#[allow(dead_code)]
impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every request on a route with `handler`.
    pub fn on<F>(&self, method: Method, path: &str, handler: F)
    where
        F: Fn(&ApiRequest) -> Reply + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .insert(route(&method, path), Arc::new(handler));
    }

    /// Answer every request on a route with a fixed JSON response.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.on(method, path, move |_| Ok(RawResponse::json(status, &body)));
    }

    /// Queue one reply, used before the route handler.
    pub fn script(&self, method: Method, path: &str, reply: Reply) {
        self.scripts
            .lock()
            .entry(route(&method, path))
            .or_default()
            .push_back(reply);
    }

    /// Delay every response on a route.
    pub fn delay(&self, method: Method, path: &str, delay: Duration) {
        self.delays.lock().insert(route(&method, path), delay);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<Recorded> {
        self.log
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    /// Refresh endpoint handing out `t2`, `t3`, ... with the given lifetime.
    pub fn issue_sequential_tokens(&self, expires_in: i64) {
        let next = Arc::new(std::sync::atomic::AtomicU32::new(2));
        self.on(Method::POST, "auth/refresh", move |_| {
            let n = next.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(RawResponse::json(
                200,
                &json!({"access_token": format!("t{}", n), "expires_in": expires_in}),
            ))
        });
    }

    /// Route that accepts only `valid` as bearer token and answers 401 otherwise.
    pub fn protect(&self, method: Method, path: &str, valid: &str, body: Value) {
        let valid = valid.to_string();
        self.on(method, path, move |req| {
            if req.bearer_token() == Some(valid.as_str()) {
                Ok(RawResponse::json(200, &body))
            } else {
                Ok(RawResponse::json(401, &json!({"error": "Token expired"})))
            }
        });
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let key = route(&request.method, &request.path);
        self.log.lock().push(Recorded {
            method: request.method.clone(),
            path: request.path.clone(),
            bearer: request.bearer_token().map(str::to_string),
            headers: request.headers.clone(),
            body: request.body.clone(),
            at: Instant::now(),
        });

        let delay = self.delays.lock().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.scripts.lock().get_mut(&key).and_then(VecDeque::pop_front);
        if let Some(reply) = scripted {
            return reply;
        }

        let handler = self.handlers.lock().get(&key).cloned();
        match handler {
            Some(handler) => handler(&request),
            None => Ok(RawResponse::json(404, &json!({"error": "Not found"}))),
        }
    }
}

#[allow(dead_code)]
pub fn test_config() -> ClientConfig {
    ClientConfig {
        api_base_url: "http://streamvoice.test/api/v1".to_string(),
        ..ClientConfig::default()
    }
}

#[allow(dead_code)]
pub fn test_user() -> UserProfile {
    UserProfile::new("42", "dj@example.com")
        .with_username("dj_nova")
        .with_role("speaker")
}

#[allow(dead_code)]
pub fn payload(token: &str, expires_in: Option<i64>) -> LoginPayload {
    let payload = LoginPayload::new(token, test_user()).with_role("speaker");
    match expires_in {
        Some(secs) => payload.with_expires_in(secs),
        None => payload,
    }
}

/// Logged-out store over in-memory storage.
#[allow(dead_code)]
pub fn test_store(backend: &Arc<FakeBackend>) -> (Arc<SessionStore>, Arc<MemoryStorage>) {
    test_store_with(test_config(), backend)
}

#[allow(dead_code)]
pub fn test_store_with(
    config: ClientConfig,
    backend: &Arc<FakeBackend>,
) -> (Arc<SessionStore>, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let store = SessionStore::new(
        config,
        storage.clone() as Arc<dyn SessionStorage>,
        backend.clone() as Arc<dyn Transport>,
    );
    (store, storage)
}
