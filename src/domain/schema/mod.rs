//! Schema registry: typed descriptors of extractable fields.
//!
//! A deployment's search schema comes from configuration; the intention
//! and prospect schemas are built in. The generic [`validate`] function
//! interprets any descriptor.

mod builtin;
mod descriptor;
mod field;
mod validator;

pub use builtin::{
    intention_extraction_schema, intention_schema, prospect_schema, DISJOINT_PREFERENCE_FIELDS,
    GENERATION_EXCLUDED_FIELDS, RETRACTED_FIELD,
};
pub use descriptor::{SchemaDescriptor, SearchSchema};
pub use field::{FieldKind, SchemaField};
pub use validator::{validate, validate_partial, SchemaValidationError};
