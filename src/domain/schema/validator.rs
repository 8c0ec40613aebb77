//! Generic validator that interprets a [`SchemaDescriptor`].
//!
//! Model output is checked here before it is allowed anywhere near the
//! merge engine.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

use super::descriptor::SchemaDescriptor;
use super::field::FieldKind;
use crate::domain::snapshot::Snapshot;

/// Errors that can occur during schema validation.
///
/// Detailed for logs; use [`SchemaValidationError::to_client_message`]
/// before returning anything to a caller.
#[derive(Debug, Clone, Error)]
pub enum SchemaValidationError {
    #[error("Missing field: {field}")]
    MissingField { field: String },

    #[error("Unexpected field: {field}")]
    UnexpectedField { field: String },

    #[error("Invalid type for field {field}: expected {expected}, got {actual}")]
    InvalidType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid value for field {field}: '{value}' is not one of {allowed:?}")]
    NotInEnum {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Invalid format for field {field}: expected {format}")]
    InvalidFormat { field: String, format: String },

    #[error("Validation errors: {0:?}")]
    Multiple(Vec<SchemaValidationError>),
}

impl SchemaValidationError {
    /// Client-safe error message.
    pub fn to_client_message(&self) -> String {
        match self {
            SchemaValidationError::MissingField { field } => {
                format!("Missing field: {}", field)
            }
            SchemaValidationError::UnexpectedField { field } => {
                format!("Unexpected field: {}", field)
            }
            SchemaValidationError::InvalidType { field, expected, .. } => {
                format!("Invalid type for field '{}': expected {}", field, expected)
            }
            SchemaValidationError::NotInEnum { field, .. } => {
                format!("Invalid value for field '{}'", field)
            }
            SchemaValidationError::InvalidFormat { field, format } => {
                format!("Field '{}' must be a valid {}", field, format)
            }
            SchemaValidationError::Multiple(errors) => errors
                .first()
                .map(|e| e.to_client_message())
                .unwrap_or_else(|| "Validation failed".to_string()),
        }
    }

    /// Number of individual failures.
    pub fn error_count(&self) -> usize {
        match self {
            SchemaValidationError::Multiple(errors) => errors.len(),
            _ => 1,
        }
    }
}

impl PartialEq for SchemaValidationError {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

/// How strictly keys are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Every declared key present, no extras.
    Strict,
    /// Declared keys may be missing, no extras.
    Partial,
}

/// Validates a complete candidate produced by structured extraction.
///
/// Every declared key must be present (a `null` value means unset) and
/// no undeclared key may appear.
pub fn validate(value: &Value, schema: &SchemaDescriptor) -> Result<Snapshot, SchemaValidationError> {
    validate_with(value, schema, Mode::Strict)
}

/// Validates a snapshot that may omit fields, such as client-held state.
pub fn validate_partial(
    value: &Value,
    schema: &SchemaDescriptor,
) -> Result<Snapshot, SchemaValidationError> {
    validate_with(value, schema, Mode::Partial)
}

fn validate_with(
    value: &Value,
    schema: &SchemaDescriptor,
    mode: Mode,
) -> Result<Snapshot, SchemaValidationError> {
    let obj = require_object(value, "root")?;
    let mut errors = Vec::new();

    for (name, field) in schema.iter() {
        match obj.get(name) {
            None if mode == Mode::Strict => errors.push(SchemaValidationError::MissingField {
                field: name.to_string(),
            }),
            None | Some(Value::Null) => {}
            Some(val) => {
                check_kind(val, &field.kind, name, &mut errors);
                if let (Some(format), Some(s)) = (field.format.as_deref(), val.as_str()) {
                    check_format(s, format, name, &mut errors);
                }
            }
        }
    }

    for key in obj.keys() {
        if !schema.contains(key) {
            errors.push(SchemaValidationError::UnexpectedField { field: key.clone() });
        }
    }

    if errors.is_empty() {
        Ok(Snapshot::from_map(obj.clone()))
    } else {
        Err(collect_errors(errors))
    }
}

fn check_kind(value: &Value, kind: &FieldKind, path: &str, errors: &mut Vec<SchemaValidationError>) {
    let type_error = |errors: &mut Vec<SchemaValidationError>| {
        errors.push(SchemaValidationError::InvalidType {
            field: path.to_string(),
            expected: kind.type_name().to_string(),
            actual: type_name(value).to_string(),
        })
    };

    match kind {
        FieldKind::String => {
            if !value.is_string() {
                type_error(errors);
            }
        }
        FieldKind::Number => {
            if !value.is_number() {
                type_error(errors);
            }
        }
        FieldKind::Integer => {
            let is_integer = value.is_i64()
                || value.is_u64()
                || value.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false);
            if !is_integer {
                type_error(errors);
            }
        }
        FieldKind::Boolean => {
            if !value.is_boolean() {
                type_error(errors);
            }
        }
        FieldKind::Enum { values } => match value.as_str() {
            Some(s) if values.iter().any(|v| v == s) => {}
            Some(s) => errors.push(SchemaValidationError::NotInEnum {
                field: path.to_string(),
                value: s.to_string(),
                allowed: values.clone(),
            }),
            None => type_error(errors),
        },
        FieldKind::Array { items } => match value.as_array() {
            Some(elements) => {
                for (i, element) in elements.iter().enumerate() {
                    check_kind(element, items, &format!("{}[{}]", path, i), errors);
                }
            }
            None => type_error(errors),
        },
        FieldKind::Object { properties } => match value.as_object() {
            Some(obj) => {
                for (name, kind) in properties {
                    match obj.get(name) {
                        None | Some(Value::Null) => {}
                        Some(val) => check_kind(val, kind, &format!("{}.{}", path, name), errors),
                    }
                }
            }
            None => type_error(errors),
        },
    }
}

fn check_format(value: &str, format: &str, path: &str, errors: &mut Vec<SchemaValidationError>) {
    // Empty strings mean unset and are not format checked.
    if format == "date" && !value.is_empty() && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
        errors.push(SchemaValidationError::InvalidFormat {
            field: path.to_string(),
            format: "date (yyyy-mm-dd)".to_string(),
        });
    }
}

fn require_object<'a>(
    value: &'a Value,
    path: &str,
) -> Result<&'a Map<String, Value>, SchemaValidationError> {
    value.as_object().ok_or_else(|| SchemaValidationError::InvalidType {
        field: path.to_string(),
        expected: "object".to_string(),
        actual: type_name(value).to_string(),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn collect_errors(mut errors: Vec<SchemaValidationError>) -> SchemaValidationError {
    if errors.len() == 1 {
        errors.remove(0)
    } else {
        SchemaValidationError::Multiple(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::SchemaField;
    use serde_json::json;

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new()
            .with_field("location", SchemaField::string("City").required())
            .with_field("startDate", SchemaField::string("Arrival").with_format("date"))
            .with_field("guests", SchemaField::new(FieldKind::Integer, "Party size"))
            .with_field("tags", SchemaField::string_array("Tags"))
            .with_field(
                "pace",
                SchemaField::new(FieldKind::one_of(["slow", "fast"]), "Travel pace"),
            )
    }

    mod strict {
        use super::*;

        #[test]
        fn accepts_complete_candidate_with_nulls() {
            let candidate = json!({
                "location": "Paris",
                "startDate": null,
                "guests": 2,
                "tags": ["museums"],
                "pace": null
            });
            let snapshot = validate(&candidate, &schema()).unwrap();
            assert_eq!(snapshot.get("location"), Some(&json!("Paris")));
        }

        #[test]
        fn rejects_missing_key() {
            let candidate = json!({
                "location": "Paris",
                "startDate": null,
                "guests": null,
                "tags": null
            });
            let err = validate(&candidate, &schema()).unwrap_err();
            assert_eq!(
                err,
                SchemaValidationError::MissingField {
                    field: "pace".to_string()
                }
            );
        }

        #[test]
        fn rejects_extra_key() {
            let candidate = json!({
                "location": null, "startDate": null, "guests": null,
                "tags": null, "pace": null, "budget": 100
            });
            let err = validate(&candidate, &schema()).unwrap_err();
            assert!(err.to_string().contains("budget"));
        }

        #[test]
        fn rejects_non_object_root() {
            let err = validate(&json!(["Paris"]), &schema()).unwrap_err();
            assert!(matches!(err, SchemaValidationError::InvalidType { .. }));
        }

        #[test]
        fn collects_every_failure() {
            let candidate = json!({
                "location": 3, "startDate": "next week", "guests": 2.5,
                "tags": [1], "pace": "medium"
            });
            let err = validate(&candidate, &schema()).unwrap_err();
            assert_eq!(err.error_count(), 5);
        }
    }

    mod partial {
        use super::*;

        #[test]
        fn allows_missing_keys() {
            let snapshot = validate_partial(&json!({ "location": "Bali" }), &schema()).unwrap();
            assert_eq!(snapshot.len(), 1);
        }

        #[test]
        fn still_checks_types() {
            assert!(validate_partial(&json!({ "tags": "beach" }), &schema()).is_err());
        }

        #[test]
        fn still_rejects_unknown_keys() {
            assert!(validate_partial(&json!({ "colour": "red" }), &schema()).is_err());
        }
    }

    mod kinds {
        use super::*;

        #[test]
        fn integer_accepts_whole_floats() {
            assert!(validate_partial(&json!({ "guests": 4.0 }), &schema()).is_ok());
        }

        #[test]
        fn date_format_is_checked() {
            assert!(validate_partial(&json!({ "startDate": "2024-06-01" }), &schema()).is_ok());
            let err = validate_partial(&json!({ "startDate": "June 1st" }), &schema()).unwrap_err();
            assert!(matches!(err, SchemaValidationError::InvalidFormat { .. }));
        }

        #[test]
        fn empty_date_string_means_unset() {
            assert!(validate_partial(&json!({ "startDate": "" }), &schema()).is_ok());
        }

        #[test]
        fn nested_object_properties_are_checked() {
            let mut properties = std::collections::BTreeMap::new();
            properties.insert("min".to_string(), FieldKind::Number);
            let schema = SchemaDescriptor::new().with_field(
                "priceRange",
                SchemaField::new(FieldKind::Object { properties }, "Range"),
            );

            assert!(validate(&json!({ "priceRange": { "min": 10 } }), &schema).is_ok());
            let err = validate(&json!({ "priceRange": { "min": "cheap" } }), &schema).unwrap_err();
            assert!(err.to_string().contains("priceRange.min"));
        }

        #[test]
        fn client_message_hides_actual_type() {
            let err = validate_partial(&json!({ "location": 3 }), &schema()).unwrap_err();
            let msg = err.to_client_message();
            assert!(msg.contains("expected string"));
            assert!(!msg.contains("number"));
        }
    }
}
