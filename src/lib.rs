//! Chat Widget - conversational preference elicitation.
//!
//! A chat assistant that, turn by turn, pulls structured search data and
//! customer intention out of the conversation, triggers a search once the
//! required fields are known, and writes personalized copy for items that
//! match the customer well enough.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
