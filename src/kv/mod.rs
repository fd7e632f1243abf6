//! Durable key-value collaborator shared by the message store, the push
//! subscription registry and the user directory.

mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::ChatError;

pub use sqlite::SqliteKv;

/// `None` when the server runs without durable storage.
pub type SharedKv = Option<Arc<dyn KvStore>>;

/// Scalar keys plus append-only lists. List indexes follow Redis: both ends
/// inclusive, negative values count back from the tail.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ChatError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), ChatError>;
    /// Returns whether anything was removed.
    async fn delete(&self, key: &str) -> Result<bool, ChatError>;
    /// Scalar keys starting with `prefix`.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ChatError>;

    /// Appends to the tail, returns the new length.
    async fn list_append(&self, key: &str, value: &str) -> Result<usize, ChatError>;
    /// Keeps only `start..=stop`.
    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> Result<(), ChatError>;
    async fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, ChatError>;
}

/// Resolves a Redis-style inclusive range over a list of `len` items into a
/// half-open `start..end`, or `None` when it selects nothing.
pub fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if len == 0 || start > stop || start >= len {
        return None;
    }

    Some((start as usize, stop as usize + 1))
}
