//! Rate limiter adapters.
//!
//! - `InMemoryRateLimiter` - fixed-window counters for a single server

mod in_memory;

pub use in_memory::InMemoryRateLimiter;
