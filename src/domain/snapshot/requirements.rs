//! Required-field gate for the downstream search.

use super::snapshot::Snapshot;
use crate::domain::schema::SchemaDescriptor;

/// Returns true when every required field holds a non-empty value.
///
/// A schema without required fields is trivially satisfied.
pub fn required_satisfied(snapshot: &Snapshot, schema: &SchemaDescriptor) -> bool {
    schema.required_fields().all(|name| snapshot.is_set(name))
}

/// Required fields still missing, in declaration order.
pub fn missing_required<'a>(snapshot: &Snapshot, schema: &'a SchemaDescriptor) -> Vec<&'a str> {
    schema
        .required_fields()
        .filter(|name| !snapshot.is_set(name))
        .collect()
}
