// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for sessions and the auth endpoints.

pub mod auth;
pub mod role;
pub mod session;
pub mod user;

pub use auth::{Credentials, OAuthCallback, RefreshResponse, Registration};
pub use role::Role;
pub use session::{AuthState, LoginPayload, Session, SessionSnapshot};
pub use user::UserProfile;
