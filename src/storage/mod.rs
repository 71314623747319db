// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session storage layer.
//!
//! A [`SessionStorage`] is a string key/value store scoped to one client
//! session (one browser tab in the web app). Only the session store writes
//! to it; everything else treats it as read-only.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;

/// Storage keys as constants.
pub mod keys {
    /// Serialized [`SessionSnapshot`](crate::models::SessionSnapshot)
    pub const USER_DETAILS: &str = "userDetails";
}

/// Key/value backend holding the persisted session snapshot.
pub trait SessionStorage: Send + Sync {
    /// Read a slot. `Ok(None)` when the slot is empty.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite a slot.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Clear a slot. Clearing an empty slot is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}
