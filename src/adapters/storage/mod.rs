//! Storage Adapters
//!
//! Implementations of the SessionStore port.
//!
//! ## Available Adapters
//!
//! - **FileSessionStore** - One JSON document per session key on disk
//! - **InMemorySessionStore** - Documents held in memory (testing/development)

mod file_session_store;
mod in_memory_session_store;
mod watchers;

pub use file_session_store::FileSessionStore;
pub use in_memory_session_store::InMemorySessionStore;
