//! Merge engine: reconciles an extraction candidate with the prior snapshot.
//!
//! Rules are chosen per field from the schema:
//!
//! - array fields take the union of prior and candidate, de-duplicated with
//!   case-insensitive string equality
//! - scalar fields take the candidate value only when it is non-empty
//!
//! The merge is pure and idempotent. Intention snapshots additionally keep
//! their preference arrays disjoint and honour explicit retractions, see
//! [`MergePolicy::intention`].

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use super::snapshot::{is_empty_value, Snapshot};
use crate::domain::schema::{SchemaDescriptor, DISJOINT_PREFERENCE_FIELDS, RETRACTED_FIELD};

/// Extra rules layered on top of the per-type merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergePolicy {
    /// Array fields whose items may appear in only one of them at a time.
    /// When the candidate places an item in one field it is removed from
    /// the others; later fields win when the candidate itself conflicts.
    pub disjoint: &'static [&'static str],
    /// Candidate-only array naming items to remove from the disjoint fields.
    pub retraction_field: Option<&'static str>,
}

impl MergePolicy {
    /// Plain accumulate-and-preserve merge used for search data.
    pub const fn accumulate() -> Self {
        Self {
            disjoint: &[],
            retraction_field: None,
        }
    }

    /// Accumulate with contradiction removal for likes, dislikes and priorities.
    pub const fn intention() -> Self {
        Self {
            disjoint: &DISJOINT_PREFERENCE_FIELDS,
            retraction_field: Some(RETRACTED_FIELD),
        }
    }

    fn is_disjoint(&self, field: &str) -> bool {
        self.disjoint.contains(&field)
    }
}

/// Merges `candidate` into `prior` under the plain accumulate policy.
pub fn merge(prior: &Snapshot, candidate: &Snapshot, schema: &SchemaDescriptor) -> Snapshot {
    merge_with(prior, candidate, schema, MergePolicy::accumulate())
}

/// Merges `candidate` into `prior` under the given policy.
///
/// Keys the schema does not declare are ignored in the candidate and kept
/// untouched in the prior.
pub fn merge_with(
    prior: &Snapshot,
    candidate: &Snapshot,
    schema: &SchemaDescriptor,
    policy: MergePolicy,
) -> Snapshot {
    let claims = candidate_claims(candidate, policy.disjoint);
    let retracted: HashSet<String> = policy
        .retraction_field
        .map(|field| items(candidate.get(field)).iter().map(dedup_key).collect())
        .unwrap_or_default();

    let mut next = prior.clone();

    for (name, field) in schema.iter() {
        if policy.retraction_field == Some(name) {
            next.remove(name);
            continue;
        }

        if field.kind.is_array() {
            let disjoint = policy.is_disjoint(name);
            let keep = |item: &Value| {
                let key = dedup_key(item);
                if !disjoint {
                    return true;
                }
                !retracted.contains(&key)
                    && claims.get(&key).map(|owner| *owner == name).unwrap_or(true)
            };

            let mut merged = Vec::new();
            union_into(&mut merged, items(prior.get(name)).into_iter().filter(|v| keep(v)));
            union_into(&mut merged, items(candidate.get(name)).into_iter().filter(|v| keep(v)));

            if merged.is_empty() {
                next.remove(name);
            } else {
                next.insert(name, Value::Array(merged));
            }
        } else {
            match candidate.get(name) {
                Some(value) if !is_empty_value(value) => {
                    next.insert(name, value.clone());
                }
                _ => {
                    if next.get(name).map(is_empty_value).unwrap_or(false) {
                        next.remove(name);
                    }
                }
            }
        }
    }

    next
}

/// Which disjoint field the candidate assigns each item to.
fn candidate_claims<'a>(candidate: &Snapshot, disjoint: &[&'a str]) -> HashMap<String, &'a str> {
    let mut claims = HashMap::new();
    for field in disjoint {
        for item in items(candidate.get(field)) {
            claims.insert(dedup_key(&item), *field);
        }
    }
    claims
}

/// Array items of a value; scalars count as a single item, null as none.
fn items(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter(|v| !is_empty_value(v)).cloned().collect(),
        Some(other) if is_empty_value(other) => Vec::new(),
        Some(other) => vec![other.clone()],
    }
}

fn union_into(target: &mut Vec<Value>, incoming: impl IntoIterator<Item = Value>) {
    let mut seen: HashSet<String> = target.iter().map(dedup_key).collect();
    for item in incoming {
        if seen.insert(dedup_key(&item)) {
            target.push(item);
        }
    }
}

fn dedup_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_lowercase(),
        other => other.to_string(),
    }
}
