//! Field descriptors: the typed building blocks of a schema.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// The kind of value a field holds.
///
/// Serialized with a `type` tag so configuration files can use the
/// familiar `{"type": "string", ...}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    Enum {
        #[serde(rename = "enum")]
        values: Vec<String>,
    },
    Array {
        #[serde(default = "default_items")]
        items: Box<FieldKind>,
    },
    Object {
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        properties: BTreeMap<String, FieldKind>,
    },
}

fn default_items() -> Box<FieldKind> {
    Box::new(FieldKind::String)
}

impl FieldKind {
    /// Array of strings, the most common accumulating field.
    pub fn string_array() -> Self {
        FieldKind::Array {
            items: default_items(),
        }
    }

    /// Enumeration over the given literal values.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldKind::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// JSON type name used in error messages and schemas.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String | FieldKind::Enum { .. } => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Array { .. } => "array",
            FieldKind::Object { .. } => "object",
        }
    }

    /// Returns true for fields that accumulate values across turns.
    pub fn is_array(&self) -> bool {
        matches!(self, FieldKind::Array { .. })
    }

    /// JSON Schema fragment for this kind.
    ///
    /// With `nullable` set, `null` is an accepted value so strict structured
    /// output can express "unset" while still listing every key.
    pub fn to_json_schema(&self, nullable: bool) -> Value {
        let type_value = |name: &str| {
            if nullable {
                json!([name, "null"])
            } else {
                json!(name)
            }
        };

        match self {
            FieldKind::Enum { values } => {
                let mut allowed: Vec<Value> = values.iter().map(|v| json!(v)).collect();
                if nullable {
                    allowed.push(Value::Null);
                }
                json!({ "type": type_value("string"), "enum": allowed })
            }
            FieldKind::Array { items } => json!({
                "type": type_value("array"),
                "items": items.to_json_schema(false),
            }),
            FieldKind::Object { properties } => {
                let mut props = Map::new();
                for (name, kind) in properties {
                    props.insert(name.clone(), kind.to_json_schema(nullable));
                }
                json!({
                    "type": type_value("object"),
                    "properties": props,
                    "required": properties.keys().collect::<Vec<_>>(),
                    "additionalProperties": false,
                })
            }
            other => json!({ "type": type_value(other.type_name()) }),
        }
    }
}

/// One extractable field: its kind plus presentation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub description: String,
    /// Must be non-empty before a downstream search may run.
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl SchemaField {
    /// Creates an optional field of the given kind.
    pub fn new(kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            required: false,
            format: None,
            example: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(FieldKind::String, description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(FieldKind::Number, description)
    }

    pub fn string_array(description: impl Into<String>) -> Self {
        Self::new(FieldKind::string_array(), description)
    }

    /// Marks the field as required for the downstream search.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets a format hint such as `date`.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// JSON Schema fragment including the description the model reads.
    pub fn to_json_schema(&self) -> Value {
        let mut schema = self.kind.to_json_schema(true);
        if let Value::Object(ref mut obj) = schema {
            if !self.description.is_empty() {
                obj.insert("description".to_string(), json!(self.description));
            }
        }
        schema
    }
}
