//! Content generation request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::ValidationError;
use crate::domain::schema::GENERATION_EXCLUDED_FIELDS;
use crate::domain::snapshot::Snapshot;

/// Voice of the generated copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Positive,
    Neutral,
    Factual,
    Fun,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Positive => "positive",
            Tone::Neutral => "neutral",
            Tone::Factual => "factual",
            Tone::Fun => "fun",
        }
    }
}

/// Everything needed to write one piece of personalized copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    pub item_information: Map<String, Value>,
    pub customer_intention: Snapshot,
    pub name: String,
    pub instructions: String,
    pub min_characters: u32,
    pub max_characters: u32,
    #[serde(default)]
    pub text_examples: Vec<String>,
    #[serde(default)]
    pub strong_match_only: bool,
    #[serde(default)]
    pub tone: Tone,
}

impl ContentRequest {
    /// Checks the request invariants.
    ///
    /// Both length bounds must be positive and `minCharacters` may not
    /// exceed `maxCharacters`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.item_information.is_empty() {
            return Err(ValidationError::empty_field("itemInformation"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if self.instructions.trim().is_empty() {
            return Err(ValidationError::empty_field("instructions"));
        }
        if self.min_characters == 0 {
            return Err(ValidationError::out_of_range(
                "minCharacters",
                1,
                i64::from(self.max_characters.max(1)),
                0,
            ));
        }
        if self.max_characters == 0 {
            return Err(ValidationError::out_of_range("maxCharacters", 1, i64::from(u32::MAX), 0));
        }
        if self.min_characters > self.max_characters {
            return Err(ValidationError::out_of_range(
                "minCharacters",
                1,
                i64::from(self.max_characters),
                i64::from(self.min_characters),
            ));
        }
        Ok(())
    }

    /// The intention as sent to the generation prompt.
    pub fn generation_intention(&self) -> Snapshot {
        self.customer_intention.without(&GENERATION_EXCLUDED_FIELDS)
    }

    /// Returns true when `len` characters fit the requested bounds.
    pub fn length_fits(&self, len: usize) -> bool {
        len >= self.min_characters as usize && len <= self.max_characters as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn request() -> ContentRequest {
        serde_json::from_value(json!({
            "itemInformation": { "title": "Seaside villa", "features": ["pool", "sea view"] },
            "customerIntention": { "objective": "transact", "budget": 900, "likes": ["swimming"] },
            "name": "villa-tag",
            "instructions": "Short and upbeat",
            "minCharacters": 10,
            "maxCharacters": 40
        }))
        .unwrap()
    }

    #[test]
    fn optional_fields_default() {
        let req = request();
        assert!(req.text_examples.is_empty());
        assert!(!req.strong_match_only);
        assert_eq!(req.tone, Tone::Positive);
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn min_above_max_is_rejected() {
        let mut req = request();
        req.min_characters = 50;
        let err = req.validate().unwrap_err();
        assert_eq!(err.field(), "minCharacters");
    }

    #[test]
    fn zero_bounds_are_rejected() {
        let mut req = request();
        req.min_characters = 0;
        assert!(req.validate().is_err());

        let mut req = request();
        req.max_characters = 0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut req = request();
        req.name = "  ".to_string();
        assert_eq!(req.validate().unwrap_err().field(), "name");
    }

    #[test]
    fn empty_item_is_rejected() {
        let mut req = request();
        req.item_information.clear();
        assert_eq!(req.validate().unwrap_err().field(), "itemInformation");
    }

    #[test]
    fn generation_intention_drops_objective_and_budget() {
        let filtered = request().generation_intention();
        let keys: Vec<_> = filtered.keys().collect();
        assert_eq!(keys, vec!["likes"]);
    }

    #[test]
    fn length_bounds_are_inclusive() {
        let req = request();
        assert!(req.length_fits(10));
        assert!(req.length_fits(40));
        assert!(!req.length_fits(9));
        assert!(!req.length_fits(41));
    }

    #[test]
    fn tone_parses_lowercase() {
        let tone: Tone = serde_json::from_value(json!("fun")).unwrap();
        assert_eq!(tone, Tone::Fun);
        assert_eq!(tone.as_str(), "fun");
    }
}
