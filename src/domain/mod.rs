//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, state machines, errors)
//! - `schema` - Typed field descriptors and the generic validator
//! - `snapshot` - Extracted value sets and the merge engine
//! - `conversation` - Chat history, turn state, session layout and prompts
//! - `content` - Match scoring, copy generation outcomes and the content cache
//! - `moderation` - Moderation verdicts
//! - `sanitize` - HTML stripping and model output hygiene

pub mod content;
pub mod conversation;
pub mod foundation;
pub mod moderation;
pub mod sanitize;
pub mod schema;
pub mod snapshot;
