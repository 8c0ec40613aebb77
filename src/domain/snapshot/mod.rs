//! Snapshots and the merge engine.

mod merge;
mod requirements;
mod snapshot;

pub use merge::{merge, merge_with, MergePolicy};
pub use requirements::{missing_required, required_satisfied};
pub use snapshot::{is_empty_value, Snapshot};
