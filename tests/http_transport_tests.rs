// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end over real HTTP against a local axum server.

use axum::{
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use streamvoice_session::config::ClientConfig;
use streamvoice_session::services::{
    ApiClient, ApiRequest, FormPayload, HttpTransport, Method, SessionStore, Transport,
    TransportError,
};
use streamvoice_session::storage::{MemoryStorage, SessionStorage};

mod common;
use common::payload;

fn header(headers: &HeaderMap, name: &str) -> Value {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null)
}

async fn echo(headers: HeaderMap) -> Json<Value> {
    Json(json!({
        "authorization": header(&headers, "authorization"),
        "userid": header(&headers, "userid"),
        "userrole": header(&headers, "userrole"),
        "content_type": header(&headers, "content-type"),
    }))
}

async fn refresh(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match header(&headers, "authorization").as_str() {
        Some("Bearer expired") => (
            StatusCode::OK,
            Json(json!({"access_token": "renewed", "expires_in": 1800})),
        ),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad token"}))),
    }
}

async fn protected(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match header(&headers, "authorization").as_str() {
        Some("Bearer renewed") => (StatusCode::OK, Json(json!({"streams": []}))),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": "Token expired"}))),
    }
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/api/v1/echo", get(echo).post(echo))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/streams", get(protected));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/v1", addr)
}

fn http_store(base_url: String) -> Arc<SessionStore> {
    let config = ClientConfig {
        api_base_url: base_url,
        ..ClientConfig::default()
    };
    let transport = HttpTransport::new(config.request_timeout).unwrap();
    SessionStore::new(
        config,
        Arc::new(MemoryStorage::new()) as Arc<dyn SessionStorage>,
        Arc::new(transport) as Arc<dyn Transport>,
    )
}

#[tokio::test]
async fn test_headers_reach_the_server() {
    let store = http_store(spawn_server().await);
    store.login(payload("t1", Some(1800)));
    let client = ApiClient::new(store);

    let response = client.get("echo").await.unwrap();
    assert_eq!(response.data["authorization"], "Bearer t1");
    assert_eq!(response.data["userid"], "42");
    assert_eq!(response.data["userrole"], "speaker");
}

#[tokio::test]
async fn test_401_recovery_over_http() {
    let store = http_store(spawn_server().await);
    store.login(payload("expired", Some(1800)));
    let client = ApiClient::new(store.clone());

    let response = client.get("streams").await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(store.access_token().as_deref(), Some("renewed"));
}

#[tokio::test]
async fn test_multipart_form_sets_boundary() {
    let store = http_store(spawn_server().await);
    store.login(payload("t1", Some(1800)));
    let client = ApiClient::new(store);

    let form = FormPayload::new().text("title", "Episode 1");
    let response = client.post_form("echo", form).await.unwrap();

    let content_type = response.data["content_type"].as_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert_eq!(response.data["authorization"], "Bearer t1");
}

#[tokio::test]
async fn test_connection_failure_is_a_transport_error() {
    // Bind and drop to find a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(None).unwrap();
    let result = transport
        .send(ApiRequest {
            method: Method::GET,
            path: "echo".to_string(),
            url: format!("http://{}/api/v1/echo", addr),
            headers: Default::default(),
            body: None,
        })
        .await;

    assert!(matches!(result, Err(TransportError::Request(_))));
}
