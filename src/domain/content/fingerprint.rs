//! Deterministic cache keys for generation requests.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

use super::request::ContentRequest;

/// SHA-256 hex digest of the content-relevant request fields.
///
/// The customer intention is not part of the key; a changed intention
/// triggers regeneration under the same key instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn of(request: &ContentRequest) -> Self {
        let payload = json!({
            "itemInformation": request.item_information,
            "name": request.name,
            "instructions": request.instructions,
            "minCharacters": request.min_characters,
            "maxCharacters": request.max_characters,
            "tone": request.tone,
            "textExamples": request.text_examples,
        });
        let canonical = canonicalize(&payload).to_string();

        let digest = Sha256::digest(canonical.as_bytes());
        let hex = digest.iter().map(|b| format!("{:02x}", b)).collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rebuilds objects with sorted keys so insertion order never changes the key.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::Tone;

    fn request(item: Value) -> ContentRequest {
        serde_json::from_value(json!({
            "itemInformation": item,
            "customerIntention": { "likes": ["sun"] },
            "name": "tag",
            "instructions": "Be brief",
            "minCharacters": 5,
            "maxCharacters": 30
        }))
        .unwrap()
    }

    #[test]
    fn is_a_sha256_hex_digest() {
        let key = ContentFingerprint::of(&request(json!({ "title": "Villa" })));
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ignores_item_key_order() {
        let a = request(json!({ "title": "Villa", "beds": 3 }));
        let b = request(json!({ "beds": 3, "title": "Villa" }));
        assert_eq!(ContentFingerprint::of(&a), ContentFingerprint::of(&b));
    }

    #[test]
    fn ignores_customer_intention() {
        let a = request(json!({ "title": "Villa" }));
        let mut b = a.clone();
        b.customer_intention.insert("dislikes", json!(["noise"]));
        assert_eq!(ContentFingerprint::of(&a), ContentFingerprint::of(&b));
    }

    #[test]
    fn changes_with_formatting_params() {
        let a = request(json!({ "title": "Villa" }));
        let mut b = a.clone();
        b.max_characters = 31;
        let mut c = a.clone();
        c.tone = Tone::Fun;
        let mut d = a.clone();
        d.text_examples.push("Sunny stay".to_string());

        let base = ContentFingerprint::of(&a);
        assert_ne!(base, ContentFingerprint::of(&b));
        assert_ne!(base, ContentFingerprint::of(&c));
        assert_ne!(base, ContentFingerprint::of(&d));
    }

    #[test]
    fn changes_with_item() {
        let a = ContentFingerprint::of(&request(json!({ "title": "Villa" })));
        let b = ContentFingerprint::of(&request(json!({ "title": "Cabin" })));
        assert_ne!(a, b);
    }
}
