//! SQLite backend for the skillgap taxonomy and profile stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The verified-skill snapshot of a user
//! competency is kept as child rows, and replaced in one transaction guarded
//! by the row's version token.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
