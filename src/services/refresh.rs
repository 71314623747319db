// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single-flight coordination of token refreshes.
//!
//! At most one refresh call is outstanding at any time. The first caller
//! starts it and parks a shared future in a single slot; every caller that
//! arrives while the slot is occupied awaits that same future and receives
//! the same outcome. The slot is emptied once the refresh settles.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::RefreshError;

/// Token handed out by a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in_secs: i64,
}

pub type RefreshOutcome = Result<RefreshedToken, RefreshError>;

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct InFlight {
    id: u64,
    future: SharedRefresh,
}

/// Single-slot shared future guarding the refresh call.
#[derive(Default)]
pub struct RefreshCoordinator {
    slot: Mutex<Option<InFlight>>,
    next_id: AtomicU64,
    /// Number of refresh calls actually started (joins not counted).
    started: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a refresh call is outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Number of refresh calls started since creation.
    pub fn refreshes_started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Start a refresh with `start`, or join the one already in flight.
    pub async fn run<F>(&self, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
    {
        self.run_unless(|| None, start).await
    }

    /// Like [`run`](Self::run), but when nothing is in flight `settled` is
    /// consulted first; returning `Some` skips the refresh call entirely.
    ///
    /// `settled` runs under the slot lock, so a caller cannot observe "no
    /// refresh in flight" and "token unchanged" from two different moments.
    pub async fn run_unless<S, F>(&self, settled: S, start: F) -> RefreshOutcome
    where
        S: FnOnce() -> Option<RefreshedToken>,
        F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
    {
        let (id, future) = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(in_flight) => {
                    tracing::debug!(refresh_id = in_flight.id, "Joining in-flight token refresh");
                    (in_flight.id, in_flight.future.clone())
                }
                None => {
                    if let Some(token) = settled() {
                        tracing::debug!("Token already replaced, skipping refresh");
                        return Ok(token);
                    }
                    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                    self.started.fetch_add(1, Ordering::SeqCst);
                    let future = start().shared();
                    *slot = Some(InFlight {
                        id,
                        future: future.clone(),
                    });
                    (id, future)
                }
            }
        };

        let outcome = future.await;

        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|in_flight| in_flight.id == id) {
            *slot = None;
        }
        outcome
    }
}
