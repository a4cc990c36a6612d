//! The `Storage` trait, a durable string key/value slot.
//!
//! The history log keeps its whole collection under a single key, so this is
//! all a backend has to provide. `diag-store-sqlite` supplies the durable
//! implementation; [`MemoryStorage`] is the in-process one used in tests.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{Arc, RwLock},
};

/// Abstraction over a durable key/value backend.
///
/// `set` must replace the previous value in one step: a reader never observes
/// a partially written value.
pub trait Storage: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the value stored under `key`, or `None` if the key is absent.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Store `value` under `key`, replacing any previous value.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete `key`. Deleting an absent key is not an error.
  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── In-memory backend ───────────────────────────────────────────────────────

/// A [`Storage`] held entirely in memory.
///
/// Cloning is cheap and clones share the same map, which lets a test keep a
/// handle for poking at the raw stored value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
  entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
  pub fn new() -> Self { Self::default() }

  /// Synchronous read of the raw value, for assertions.
  pub fn raw(&self, key: &str) -> Option<String> {
    self
      .entries
      .read()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .get(key)
      .cloned()
  }

  /// Synchronous write of a raw value, for seeding fixtures.
  pub fn put_raw(&self, key: &str, value: impl Into<String>) {
    self
      .entries
      .write()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .insert(key.to_owned(), value.into());
  }
}

impl Storage for MemoryStorage {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    Ok(self.raw(key))
  }

  async fn set(&self, key: &str, value: String) -> Result<(), Infallible> {
    self.put_raw(key, value);
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), Infallible> {
    self
      .entries
      .write()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .remove(key);
    Ok(())
  }
}
