//! Content module - match scoring and personalized copy.
//!
//! Requests are fingerprinted for the client cache, optionally gated on a
//! match score, and resolve to one of three [`GenerationResult`] outcomes.

mod entry;
mod fingerprint;
mod matching;
mod prompts;
mod request;
mod result;

pub use entry::{ContentStatus, GeneratedContentEntry, GeneratedContentStore, CONTENT_STORAGE_KEY};
pub use fingerprint::ContentFingerprint;
pub use matching::{MatchScore, MatchThreshold, DEFAULT_MATCH_THRESHOLD};
pub use prompts::{
    generation_output_schema, generation_system_prompt, generation_user_prompt,
    match_output_schema, match_user_prompt, MATCH_ANALYSIS_FORMAT, MATCH_SYSTEM_PROMPT,
    PERSONALIZED_CONTENT_FORMAT,
};
pub use request::{ContentRequest, Tone};
pub use result::{
    CopyMetadata, GeneratedCopy, GenerationMetadata, GenerationResult, MatchFailureMetadata,
    MatchMetadata,
};
