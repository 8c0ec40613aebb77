//! Search Trigger Adapters
//!
//! - **ChannelSearchTrigger** - Hands completed search snapshots to a consumer task

mod channel_search_trigger;

pub use channel_search_trigger::{ChannelSearchTrigger, SearchRequest};
