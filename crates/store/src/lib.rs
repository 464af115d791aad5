//! Todo persistence backends for taskpilot.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryTaskStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTaskStore;
