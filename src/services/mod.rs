// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - session lifecycle and API access.

pub mod api_client;
pub mod auth;
pub mod refresh;
pub mod session_store;
pub mod timer;
pub mod transport;

pub use api_client::{ApiClient, ApiResponse};
pub use auth::AuthService;
pub use refresh::{RefreshCoordinator, RefreshOutcome, RefreshedToken};
pub use session_store::SessionStore;
pub use timer::RefreshTimer;
pub use transport::{ApiRequest, FormPayload, HttpTransport, Method, RawResponse, RequestBody, Transport, TransportError};
