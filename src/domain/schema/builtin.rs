//! Built-in schemas for customer intention and customer prospect.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use super::descriptor::SchemaDescriptor;
use super::field::{FieldKind, SchemaField};

/// Key naming items the customer explicitly withdrew.
///
/// Present only in the extraction schema; the merge engine consumes it and
/// it never reaches the persisted intention snapshot.
pub const RETRACTED_FIELD: &str = "retracted";

/// Preference arrays that must stay semantically disjoint.
pub const DISJOINT_PREFERENCE_FIELDS: [&str; 3] = ["likes", "dislikes", "priorities"];

/// Keys left out of content generation prompts.
pub const GENERATION_EXCLUDED_FIELDS: [&str; 2] = ["objective", "budget"];

static INTENTION_SCHEMA: Lazy<SchemaDescriptor> = Lazy::new(|| {
    SchemaDescriptor::new()
        .with_field(
            "objective",
            SchemaField::new(
                FieldKind::one_of(["discover", "transact", "compare", "resolve", "customize"]),
                "The primary goal the customer aims to achieve. If not clear, leave unset.",
            ),
        )
        .with_field(
            "budget",
            SchemaField::number(
                "The amount the customer wants to spend. If not explicitly mentioned, leave unset.",
            ),
        )
        .with_field(
            "urgency_level",
            SchemaField::new(
                FieldKind::one_of(["1", "2", "3"]),
                "How urgently the customer needs to achieve their objective (1: low, 2: medium, 3: high). If not clear, leave unset.",
            ),
        )
        .with_field(
            "pain_points",
            SchemaField::string_array(
                "The challenges or problems the customer is trying to solve. Unless explicitly stated, leave unset.",
            ),
        )
        .with_field(
            "likes",
            SchemaField::string_array("The customer's likes. If not clear, leave unset."),
        )
        .with_field(
            "dislikes",
            SchemaField::string_array("The customer's dislikes. If not clear, leave unset."),
        )
        .with_field(
            "priorities",
            SchemaField::string_array(
                "The customer's priorities as single words, e.g. price, location, style. If not clear, leave unset.",
            ),
        )
});

static INTENTION_EXTRACTION_SCHEMA: Lazy<SchemaDescriptor> = Lazy::new(|| {
    INTENTION_SCHEMA.clone().with_field(
        RETRACTED_FIELD,
        SchemaField::string_array(
            "Items the customer explicitly withdrew from their likes, dislikes or priorities in the latest messages. Leave unset when nothing was withdrawn.",
        ),
    )
});

static PROSPECT_SCHEMA: Lazy<SchemaDescriptor> = Lazy::new(|| {
    let mut price_range = BTreeMap::new();
    price_range.insert("min".to_string(), FieldKind::Number);
    price_range.insert("max".to_string(), FieldKind::Number);

    SchemaDescriptor::new()
        .with_field(
            "type",
            SchemaField::string("The type or category of prospect the customer is looking for"),
        )
        .with_field(
            "priceRange",
            SchemaField::new(
                FieldKind::Object {
                    properties: price_range,
                },
                "The price range the customer is willing to consider",
            ),
        )
        .with_field(
            "specifications",
            SchemaField::string_array("Key specifications or features the customer has mentioned"),
        )
        .with_field(
            "preferences",
            SchemaField::string_array("Specific preferences or requirements mentioned by the customer"),
        )
});

/// Schema of the persisted customer intention snapshot.
pub fn intention_schema() -> &'static SchemaDescriptor {
    &INTENTION_SCHEMA
}

/// Intention schema plus the retraction channel, sent to the model.
pub fn intention_extraction_schema() -> &'static SchemaDescriptor {
    &INTENTION_EXTRACTION_SCHEMA
}

/// Schema of the customer prospect object.
pub fn prospect_schema() -> &'static SchemaDescriptor {
    &PROSPECT_SCHEMA
}
