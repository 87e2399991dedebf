//! SQLite backends for the Campus document store and identity directory.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The two backends open separate
//! connections and never share a transaction, matching the two independent
//! systems the provisioning saga coordinates.

mod directory;
mod encode;
mod schema;
mod store;

pub mod error;

pub use directory::SqliteDirectory;
pub use error::{Error, Result};
pub use store::SqliteStore;
