//! SQLite backend for the diagnosis history.
//!
//! Implements [`diag_core::storage::Storage`] as a single key/value table.
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStorage;

#[cfg(test)]
mod tests;
