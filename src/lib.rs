// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! StreamVoice session client
//!
//! This crate keeps a StreamVoice login alive: it persists the session,
//! refreshes the access token before it expires, and wraps API calls with
//! coordinated 401 recovery and bounded retry.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod time_utils;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use services::{ApiClient, AuthService, SessionStore};
