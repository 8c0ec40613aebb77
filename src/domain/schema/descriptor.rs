//! Schema descriptor: an ordered set of named fields.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::field::SchemaField;

/// Ordered mapping from field name to [`SchemaField`].
///
/// Field names are unique. Declaration order is kept so prompts and any
/// UI list fields the way the configuration declared them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct SchemaDescriptor {
    fields: Vec<(String, SchemaField)>,
}

/// The schema of the search data a deployment wants to collect.
pub type SearchSchema = SchemaDescriptor;

impl SchemaDescriptor {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing any existing field with the same name.
    pub fn with_field(mut self, name: impl Into<String>, field: SchemaField) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = field,
            None => self.fields.push((name, field)),
        }
        self
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&SchemaField> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, field)| field)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaField)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Fields that must be filled before a downstream search.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, field)| field.required)
            .map(|(name, _)| name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Strict JSON Schema for structured model output.
    ///
    /// Every declared key is listed as required and no other keys are
    /// allowed; individual values are nullable to express "unset".
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for (name, field) in self.iter() {
            properties.insert(name.to_string(), field.to_json_schema());
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": self.field_names().collect::<Vec<_>>(),
            "additionalProperties": false,
        })
    }
}

impl TryFrom<Map<String, Value>> for SchemaDescriptor {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut fields = Vec::with_capacity(map.len());
        for (name, raw) in map {
            let field: SchemaField = serde_json::from_value(raw)
                .map_err(|e| format!("invalid schema field '{}': {}", name, e))?;
            fields.push((name, field));
        }
        Ok(Self { fields })
    }
}

impl From<SchemaDescriptor> for Map<String, Value> {
    fn from(schema: SchemaDescriptor) -> Self {
        schema
            .fields
            .into_iter()
            .map(|(name, field)| {
                let value = serde_json::to_value(field).unwrap_or(Value::Null);
                (name, value)
            })
            .collect()
    }
}
