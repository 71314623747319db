// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cancellable scheduled task for proactive token refresh.
//!
//! Holds at most one pending task. Scheduling replaces (and aborts) the
//! previous one, so there are never two live timers. Runs on `tokio::time`,
//! which lets tests drive it with a paused clock.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::time_utils;

struct Scheduled {
    id: u64,
    handle: JoinHandle<()>,
    delay: Duration,
    deadline: DateTime<Utc>,
}

/// Single-slot timer.
#[derive(Default)]
pub struct RefreshTimer {
    slot: Mutex<Option<Scheduled>>,
    next_id: AtomicU64,
}

impl RefreshTimer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run `task` after `delay`, replacing any pending task.
    ///
    /// Returns `false` when called outside a Tokio runtime; nothing is
    /// scheduled in that case.
    pub fn schedule<F>(self: &Arc<Self>, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("No async runtime available, refresh not scheduled");
                return false;
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let timer = Arc::downgrade(self);

        // The slot stays locked until the new entry is stored, so a task
        // firing immediately always finds itself in the slot.
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }

        let handle = runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let armed = timer.upgrade().is_some_and(|timer| timer.disarm(id));
            if armed {
                task.await;
            }
        });

        *slot = Some(Scheduled {
            id,
            handle,
            delay,
            deadline: time_utils::deadline_after(delay),
        });
        true
    }

    /// Run `task` right away (on the runtime), replacing any pending task.
    pub fn fire_now<F>(self: &Arc<Self>, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.schedule(Duration::ZERO, task)
    }

    /// Abort the pending task. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.slot.lock().take() {
            Some(scheduled) => {
                scheduled.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a task is waiting to fire.
    pub fn is_armed(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Delay the pending task was scheduled with.
    pub fn pending_delay(&self) -> Option<Duration> {
        self.slot.lock().as_ref().map(|s| s.delay)
    }

    /// Wall-clock time the pending task is due.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.slot.lock().as_ref().map(|s| s.deadline)
    }

    /// Remove entry `id` without aborting it; the task is now running.
    fn disarm(&self, id: u64) -> bool {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|s| s.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        if let Some(scheduled) = self.slot.get_mut().take() {
            scheduled.handle.abort();
        }
    }
}
